//! Event logging for causim simulations.
//!
//! Every node appends one [`LogEntry`] per handled outcome to its own
//! [`EventLog`]. Once all nodes have terminated, [`MergedLog::merge`]
//! concatenates the logs, computes the average send payload size, and
//! stable-sorts the entries by wall-clock offset for rendering.
//!
//! The rendered order is real-time order, not causal order. Causal order
//! can be recovered from the vector clock snapshot carried by every entry.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod entry;
pub mod event_log;
pub mod merge;

pub use entry::{EventKind, LogEntry};
pub use event_log::EventLog;
pub use merge::MergedLog;
