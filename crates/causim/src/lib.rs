//! causim: a vector clock simulator.
//!
//! `n` nodes on an undirected graph exchange messages over FIFO links,
//! each timestamping events with a vector clock. Two clock disciplines can
//! be compared: the naive full-vector broadcast and the
//! Singhal–Kshemkalyani delta broadcast. Every node logs what it did, the
//! logs are merged into real-time order, and the average bytes carried per
//! send is reported.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all causim sub-crates, plus the input file parser used by the binary.
//!
//! # Quick start
//!
//! ```rust
//! use causim::prelude::*;
//!
//! let spec = causim::input::parse("3 1.0 1.0 5\n1 2 3\n2 3\n").unwrap();
//! let config = spec.into_config(AlgorithmKind::Sk, 42).unwrap();
//! let output = LockstepSimulation::new(config).unwrap().run().unwrap();
//! assert!(output.merged.is_time_ordered());
//! assert!(audit(&output.logs, &Topology::complete(3).unwrap(), 5).is_clean());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `causim-core` | Node ids, vector clocks, parameters, errors |
//! | [`clock`] | `causim-clock` | Naive and SK algorithms, wire format |
//! | [`log`] | `causim-log` | Per-node logs and the merge step |
//! | [`engine`] | `causim-engine` | Node state machine, topology, runners, audit |
//! | [`input`] | this crate | Input file parser |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod input;

/// Node ids, vector clocks, simulation parameters and shared errors
/// (`causim-core`).
pub use causim_core as types;

/// Clock algorithms and their wire format (`causim-clock`).
///
/// [`clock::NaiveClock`] and [`clock::SkClock`] both implement
/// [`clock::ClockAlgorithm`].
pub use causim_clock as clock;

/// Event logs and the merge-and-render step (`causim-log`).
pub use causim_log as log;

/// Simulation engine (`causim-engine`).
///
/// [`engine::LockstepSimulation`] for reproducible single-threaded runs,
/// [`engine::RealtimeSimulation`] for one thread per node.
pub use causim_engine as engine;

/// Common imports for typical causim usage.
pub mod prelude {
    // Core types
    pub use causim_core::{NodeError, NodeId, SimParams, VectorClock};

    // Clocks
    pub use causim_clock::{AlgorithmKind, ClockAlgorithm};

    // Logs
    pub use causim_log::{EventKind, EventLog, LogEntry, MergedLog};

    // Engine
    pub use causim_engine::{
        audit, run, AuditReport, ConfigError, LockstepSimulation, Mode, RealtimeSimulation,
        RunOutput, SimConfig, SimError, Topology,
    };

    // Input
    pub use crate::input::{InputError, InputSpec};
}
