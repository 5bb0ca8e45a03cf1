//! Naive vector clock: the full vector travels with every message.

use causim_core::{NodeId, VectorClock, WireError};

use crate::algorithm::{AlgorithmKind, ClockAlgorithm};
use crate::wire::{decode_full, encode_full, Payload};

/// Full-vector broadcast. Payload size is always `4 * (n + 1)` bytes.
#[derive(Clone, Debug)]
pub struct NaiveClock {
    own: NodeId,
    node_count: usize,
}

impl NaiveClock {
    /// Algorithm state for node `own` among `node_count` nodes.
    pub fn new(own: NodeId, node_count: usize) -> Self {
        Self { own, node_count }
    }
}

impl ClockAlgorithm for NaiveClock {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Naive
    }

    fn merge(&mut self, vtime: &mut VectorClock, payload: &[u8]) -> Result<NodeId, WireError> {
        let msg = decode_full(payload, self.node_count)?;
        for k in 0..self.node_count {
            // The own component only moves through Rule 1.
            if k == self.own.index() {
                continue;
            }
            let incoming = msg.clock.get(k);
            if incoming > vtime.get(k) {
                vtime.set(k, incoming);
            }
        }
        Ok(msg.sender)
    }

    fn construct(&mut self, vtime: &VectorClock, _target: NodeId) -> Payload {
        encode_full(vtime, self.own)
    }
}
