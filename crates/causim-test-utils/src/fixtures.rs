//! Reusable fixtures.
//!
//! - [`scenario_params`] / [`triangle_edges`]: three fully connected nodes,
//!   `l = 1.0`, `a = 1.0`, `m = 5`.
//! - [`TRIANGLE_INPUT`]: the same scenario as an input file.
//! - [`MockClock`]: a clock algorithm that records calls and never touches
//!   the vector.

use std::sync::{Arc, Mutex};

use causim_clock::{AlgorithmKind, ClockAlgorithm, Payload};
use causim_core::{NodeId, SimParams, VectorClock, WireError};

/// Parameters of the reference scenario.
pub fn scenario_params() -> SimParams {
    SimParams {
        node_count: 3,
        mean_interarrival_ms: 1.0,
        send_bias: 1.0,
        send_quota: 5,
    }
}

/// Edges of the complete graph on three nodes.
pub fn triangle_edges() -> Vec<(NodeId, NodeId)> {
    edges(&[(0, 1), (0, 2), (1, 2)])
}

/// Edge list from raw zero-based ids.
pub fn edges(raw: &[(u32, u32)]) -> Vec<(NodeId, NodeId)> {
    raw.iter().map(|&(a, b)| (NodeId(a), NodeId(b))).collect()
}

/// The reference scenario in the input file format (1-based ids).
pub const TRIANGLE_INPUT: &str = "3 1.0 1.0 5\n1 2 3\n2 1 3\n3 1 2\n";

/// What a [`MockClock`] has been asked to do.
#[derive(Debug, Default)]
pub struct MockCalls {
    /// Targets passed to `construct`, in call order.
    pub constructs: Vec<NodeId>,
    /// Number of `merge` calls.
    pub merges: usize,
}

/// Clock algorithm that records calls and returns a fixed payload.
///
/// `merge` reports [`MockClock::SENDER`] as the sender and leaves the
/// vector unchanged.
pub struct MockClock {
    calls: Arc<Mutex<MockCalls>>,
}

impl MockClock {
    /// Payload returned by every `construct`.
    pub const PAYLOAD: &'static [u8] = &[0xC0, 0xFF, 0xEE, 0x00];

    /// Sender id reported by every `merge`.
    pub const SENDER: NodeId = NodeId(1);

    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(MockCalls::default())),
        }
    }

    /// Shared handle to the call record; stays valid after the mock is
    /// boxed and moved into a node.
    pub fn calls(&self) -> Arc<Mutex<MockCalls>> {
        Arc::clone(&self.calls)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockAlgorithm for MockClock {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Naive
    }

    fn merge(&mut self, _vtime: &mut VectorClock, _payload: &[u8]) -> Result<NodeId, WireError> {
        self.calls.lock().expect("mock poisoned").merges += 1;
        Ok(Self::SENDER)
    }

    fn construct(&mut self, _vtime: &VectorClock, target: NodeId) -> Payload {
        self.calls
            .lock()
            .expect("mock poisoned")
            .constructs
            .push(target);
        Self::PAYLOAD.to_vec()
    }
}
