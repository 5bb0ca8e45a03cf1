//! The [`ClockAlgorithm`] strategy trait and [`AlgorithmKind`] selector.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use causim_core::{NodeId, VectorClock, WireError};

use crate::naive::NaiveClock;
use crate::sk::SkClock;
use crate::wire::Payload;

/// Receive-merge and send-construct rules for one node.
///
/// # Contract
///
/// - The node owns `vtime`; the algorithm only reads or merges into it.
///   Rule 1 (the own-component increment) is applied by the node, never
///   by the algorithm.
/// - `merge()` is only called with non-empty payloads; termination
///   markers never reach the algorithm.
/// - `construct()` is called once per data send, before the node's own
///   increment for that send event.
///
/// # Object safety
///
/// The trait is object-safe; nodes hold a `Box<dyn ClockAlgorithm>`.
pub trait ClockAlgorithm: Send + 'static {
    /// Which discipline this is.
    fn kind(&self) -> AlgorithmKind;

    /// Apply an inbound data payload to `vtime` (Rule 2).
    ///
    /// Returns the sender id carried in the payload's metadata, which the
    /// node records as the `Recv` peer.
    fn merge(&mut self, vtime: &mut VectorClock, payload: &[u8]) -> Result<NodeId, WireError>;

    /// Build the payload for a data send to `target`.
    fn construct(&mut self, vtime: &VectorClock, target: NodeId) -> Payload;
}

/// Selects one of the two clock disciplines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    /// Full-vector broadcast.
    Naive,
    /// Singhal–Kshemkalyani delta broadcast.
    Sk,
}

impl AlgorithmKind {
    /// Both kinds, naive first.
    pub const ALL: [AlgorithmKind; 2] = [AlgorithmKind::Naive, AlgorithmKind::Sk];

    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Sk => "sk",
        }
    }

    /// Instantiate the algorithm state for node `own` in a system of
    /// `node_count` nodes.
    pub fn build(self, own: NodeId, node_count: usize) -> Box<dyn ClockAlgorithm> {
        match self {
            Self::Naive => Box::new(NaiveClock::new(own, node_count)),
            Self::Sk => Box::new(SkClock::new(own, node_count)),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized algorithm name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseAlgorithmError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseAlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown clock algorithm '{}' (expected 'naive' or 'sk')",
            self.input
        )
    }
}

impl Error for ParseAlgorithmError {}

impl FromStr for AlgorithmKind {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" | "vc" => Ok(Self::Naive),
            "sk" => Ok(Self::Sk),
            _ => Err(ParseAlgorithmError {
                input: s.to_string(),
            }),
        }
    }
}
