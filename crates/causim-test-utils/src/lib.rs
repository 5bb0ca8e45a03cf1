//! Test utilities and mock types for causim development.
//!
//! Provides the reference scenario fixtures used across the workspace's
//! tests and a [`MockClock`] that records how a node drives its
//! [`ClockAlgorithm`](causim_clock::ClockAlgorithm).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    edges, scenario_params, triangle_edges, MockCalls, MockClock, TRIANGLE_INPUT,
};
