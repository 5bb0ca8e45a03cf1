//! Vector clock algorithms for causim.
//!
//! Both disciplines implement the [`ClockAlgorithm`] strategy trait, so the
//! node state machine is written once and handed either one at runtime:
//!
//! - [`NaiveClock`] ships the full vector on every send, `4 * (n + 1)` bytes.
//! - [`SkClock`] (Singhal–Kshemkalyani) ships only the components updated
//!   since the last direct send to the same neighbor, `8 * (k + 1)` bytes.
//!
//! The byte layout of both payloads lives in [`wire`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod algorithm;
pub mod naive;
pub mod sk;
pub mod wire;

pub use algorithm::{AlgorithmKind, ClockAlgorithm, ParseAlgorithmError};
pub use naive::NaiveClock;
pub use sk::SkClock;
pub use wire::Payload;
