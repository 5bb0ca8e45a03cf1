//! Simulation engine for causim.
//!
//! Wires a [`Topology`] of [`ProcessNode`]s together and runs them to
//! termination, either on one OS thread per node ([`RealtimeSimulation`])
//! or on the calling thread under virtual time ([`LockstepSimulation`]).
//! Both runners hand back a [`RunOutput`] with the per-node logs and their
//! merge; [`audit`] re-checks the causal properties on the result.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod channel;
pub mod config;
pub mod lockstep;
pub mod node;
pub mod outcome;
pub mod realtime;
pub mod sampler;
pub mod topology;

pub use audit::{audit, AuditReport, Violation};
pub use config::{ConfigError, SimConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_LINK_LATENCY};
pub use lockstep::LockstepSimulation;
pub use node::{Outgoing, Phase, ProcessNode, TerminationTracker};
pub use outcome::{run, Mode, ParseModeError, RunOutput, SimError};
pub use realtime::RealtimeSimulation;
pub use topology::{Topology, TopologyError};
