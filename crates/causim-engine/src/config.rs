//! Simulation configuration, validation and error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use causim_clock::AlgorithmKind;
use causim_core::{NodeId, SimParams};

use crate::node::ProcessNode;
use crate::topology::{Topology, TopologyError};

/// Drain timeout used when none is configured.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Virtual link latency used by the lockstep runner when none is configured.
pub const DEFAULT_LINK_LATENCY: Duration = Duration::from_micros(100);

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`SimConfig`] or starting workers.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The topology is malformed.
    Topology(TopologyError),
    /// `l` is NaN, infinite, zero, or negative.
    InvalidInterarrival {
        /// The invalid value.
        value: f64,
    },
    /// `a` is NaN, infinite, or at most `-1`.
    InvalidSendBias {
        /// The invalid value.
        value: f64,
    },
    /// `params.node_count` disagrees with the topology.
    NodeCountMismatch {
        /// Node count from the parameters.
        params: usize,
        /// Node count of the topology.
        topology: usize,
    },
    /// A node has no neighbors but must make `m > 0` sends.
    IsolatedNode {
        /// The isolated node.
        node: NodeId,
    },
    /// The drain timeout is zero.
    ZeroDrainTimeout,
    /// A worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::InvalidInterarrival { value } => write!(
                f,
                "mean inter-arrival time must be finite and positive, got {value}"
            ),
            Self::InvalidSendBias { value } => {
                write!(f, "send bias must be finite and greater than -1, got {value}")
            }
            Self::NodeCountMismatch { params, topology } => write!(
                f,
                "parameters declare {params} nodes but the topology has {topology}"
            ),
            Self::IsolatedNode { node } => write!(
                f,
                "node {node} has no neighbors and could never meet its send quota"
            ),
            Self::ZeroDrainTimeout => write!(f, "drain timeout must be non-zero"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Topology(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TopologyError> for ConfigError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

// ── SimConfig ──────────────────────────────────────────────────────

/// Complete configuration for one simulation run.
///
/// Passed to [`LockstepSimulation::new`](crate::LockstepSimulation::new)
/// or [`RealtimeSimulation::new`](crate::RealtimeSimulation::new), which
/// both call [`validate()`](SimConfig::validate) before building nodes.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// `(n, l, a, m)`.
    pub params: SimParams,
    /// Communication graph.
    pub topology: Topology,
    /// Clock discipline shared by every node.
    pub algorithm: AlgorithmKind,
    /// Run seed. Each node derives its own stream from it.
    pub seed: u64,
    /// Receive timeout while draining (realtime only). Default: 1 s.
    pub drain_timeout: Duration,
    /// Virtual delivery delay (lockstep only). Default: 100 µs.
    pub link_latency: Duration,
}

impl SimConfig {
    /// Config with default seed, drain timeout and link latency.
    pub fn new(params: SimParams, topology: Topology, algorithm: AlgorithmKind) -> Self {
        Self {
            params,
            topology,
            algorithm,
            seed: 0,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            link_latency: DEFAULT_LINK_LATENCY,
        }
    }

    /// Replace the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the algorithm.
    pub fn with_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = self.params.mean_interarrival_ms;
        if !l.is_finite() || l <= 0.0 {
            return Err(ConfigError::InvalidInterarrival { value: l });
        }
        let a = self.params.send_bias;
        if !a.is_finite() || a <= -1.0 {
            return Err(ConfigError::InvalidSendBias { value: a });
        }
        if self.params.node_count != self.topology.node_count() {
            return Err(ConfigError::NodeCountMismatch {
                params: self.params.node_count,
                topology: self.topology.node_count(),
            });
        }
        if self.params.send_quota > 0 {
            if let Some(node) = self.topology.nodes().find(|&n| self.topology.degree(n) == 0) {
                return Err(ConfigError::IsolatedNode { node });
            }
        }
        if self.drain_timeout.is_zero() {
            return Err(ConfigError::ZeroDrainTimeout);
        }
        Ok(())
    }

    /// One fresh node per topology vertex, in id order.
    pub fn build_nodes(&self) -> Vec<ProcessNode> {
        self.topology
            .nodes()
            .map(|id| {
                ProcessNode::new(
                    id,
                    self.topology.neighbors(id).to_vec(),
                    &self.params,
                    self.algorithm,
                    self.seed,
                )
            })
            .collect()
    }
}
