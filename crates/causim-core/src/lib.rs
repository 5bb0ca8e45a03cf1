//! Core types for the causim vector-clock simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the node identifier, the vector clock value type, the simulation
//! parameters, and the error enums shared by the other crates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod id;
pub mod params;

pub use clock::VectorClock;
pub use error::{NodeError, WireError};
pub use id::NodeId;
pub use params::SimParams;
