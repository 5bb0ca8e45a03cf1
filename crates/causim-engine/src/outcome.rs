//! Run results and run-level errors shared by both runners.

use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use causim_clock::AlgorithmKind;
use causim_core::{NodeError, NodeId, SimParams};
use causim_log::{EventLog, MergedLog};

use crate::config::{ConfigError, SimConfig};
use crate::lockstep::LockstepSimulation;
use crate::realtime::RealtimeSimulation;

// ── SimError ───────────────────────────────────────────────────────

/// Why a run did not produce a merged log.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// The configuration was rejected, or workers could not start.
    Config(ConfigError),
    /// A node hit a fatal invariant violation.
    Node(NodeError),
    /// A worker thread panicked.
    WorkerPanicked {
        /// The node whose worker panicked.
        node: NodeId,
    },
    /// Lockstep only: nothing is pending but some nodes have not
    /// terminated.
    Stalled {
        /// Nodes still waiting.
        waiting: Vec<NodeId>,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Node(e) => write!(f, "node: {e}"),
            Self::WorkerPanicked { node } => write!(f, "worker for node {node} panicked"),
            Self::Stalled { waiting } => {
                write!(f, "simulation stalled with {} node(s) waiting:", waiting.len())?;
                for node in waiting {
                    write!(f, " {node}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Node(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<NodeError> for SimError {
    fn from(e: NodeError) -> Self {
        Self::Node(e)
    }
}

// ── RunOutput ──────────────────────────────────────────────────────

/// Everything a finished run hands back.
#[derive(Clone, Debug)]
pub struct RunOutput {
    /// Algorithm the nodes ran.
    pub algorithm: AlgorithmKind,
    /// Per-node logs, indexed by node id.
    pub logs: Vec<EventLog>,
    /// Logs merged into real-time order.
    pub merged: MergedLog,
    /// Wall-clock duration of the run.
    pub wall_time: Duration,
}

impl RunOutput {
    pub(crate) fn new(
        algorithm: AlgorithmKind,
        logs: Vec<EventLog>,
        params: &SimParams,
        wall_time: Duration,
    ) -> Self {
        let merged = MergedLog::merge(logs.clone(), params);
        Self {
            algorithm,
            logs,
            merged,
            wall_time,
        }
    }

    /// Average bytes per send event.
    pub fn average_payload_bytes(&self) -> f64 {
        self.merged.average_payload_bytes()
    }
}

// ── Mode ───────────────────────────────────────────────────────────

/// Which runner executes the nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// One OS thread per node, wall-clock timing.
    #[default]
    Realtime,
    /// Single thread, virtual time, reproducible.
    Lockstep,
}

impl Mode {
    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Lockstep => "lockstep",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized mode name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseModeError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode {:?}, expected \"realtime\" or \"lockstep\"",
            self.input
        )
    }
}

impl Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "realtime" => Ok(Self::Realtime),
            "lockstep" => Ok(Self::Lockstep),
            _ => Err(ParseModeError {
                input: s.to_string(),
            }),
        }
    }
}

/// Validate `config` and run it to completion under `mode`.
pub fn run(config: SimConfig, mode: Mode) -> Result<RunOutput, SimError> {
    match mode {
        Mode::Realtime => RealtimeSimulation::new(config)?.run(),
        Mode::Lockstep => LockstepSimulation::new(config)?.run(),
    }
}
