//! Deterministic single-threaded runner.
//!
//! [`LockstepSimulation`] drives every [`ProcessNode`] on the calling thread
//! under a discrete-event scheduler with virtual microsecond time. It makes
//! the same decisions a realtime run makes, minus the scheduling noise:
//!
//! - a running node that starts waiting at `t` with wait `w` has a deadline
//!   at `t + w`;
//! - a message sent at `t` is delivered at `t + link_latency`;
//! - a delivery at or before the recipient's deadline wakes it with the
//!   message, cancelling the deadline; otherwise the deadline fires;
//! - a draining node has no deadline, since drain timeouts log nothing.
//!
//! Virtual time saturates at `u64::MAX` microseconds. Events that would
//! land past it all happen at `u64::MAX`, in the order above.
//!
//! Events at equal times are ordered deliveries first, then by insertion
//! sequence. Constant latency plus sequence tie-break keeps every link FIFO.
//! Two runs of the same config therefore render byte-identical logs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use causim_clock::Payload;
use causim_core::{NodeError, NodeId};
use tracing::{info, trace};

use crate::config::{ConfigError, SimConfig};
use crate::node::{Outgoing, Phase, ProcessNode};
use crate::outcome::{RunOutput, SimError};

// Compile-time assertion: LockstepSimulation can move across threads.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<LockstepSimulation>();
    }
};

// ── Scheduler ──────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Class {
    Delivery,
    Deadline,
}

#[derive(Debug, PartialEq, Eq)]
struct Pending {
    at: u64,
    class: Class,
    seq: u64,
    node: NodeId,
    from: NodeId,
    payload: Payload,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.at, &self.class, self.seq).cmp(&(other.at, &other.class, other.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Reverse<Pending>>,
    next_seq: u64,
}

impl Queue {
    fn push(
        &mut self,
        at: u64,
        class: Class,
        node: NodeId,
        from: NodeId,
        payload: Payload,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Pending {
            at,
            class,
            seq,
            node,
            from,
            payload,
        }));
        seq
    }

    fn pop(&mut self) -> Option<Pending> {
        self.heap.pop().map(|Reverse(p)| p)
    }
}

// ── LockstepSimulation ─────────────────────────────────────────────

/// Single-threaded, virtual-time simulation.
///
/// # Example
///
/// ```ignore
/// let output = LockstepSimulation::new(config)?.run()?;
/// print!("{}", output.merged);
/// ```
pub struct LockstepSimulation {
    config: SimConfig,
    nodes: Vec<ProcessNode>,
    /// Sequence number of each node's live deadline.
    deadlines: Vec<Option<u64>>,
    queue: Queue,
    latency_us: u64,
}

impl LockstepSimulation {
    /// Validate `config` and build one node per topology vertex.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let nodes = config.build_nodes();
        let deadlines = vec![None; nodes.len()];
        let latency_us = config.link_latency.as_micros() as u64;
        Ok(Self {
            config,
            nodes,
            deadlines,
            queue: Queue::default(),
            latency_us,
        })
    }

    /// Run until every node has terminated.
    pub fn run(mut self) -> Result<RunOutput, SimError> {
        let started = Instant::now();
        info!(
            nodes = self.nodes.len(),
            algorithm = %self.config.algorithm,
            seed = self.config.seed,
            "lockstep run started"
        );

        for i in 0..self.nodes.len() {
            self.settle(i, 0)?;
        }

        let mut now = 0;
        while let Some(event) = self.queue.pop() {
            now = event.at;
            let i = event.node.index();
            match event.class {
                Class::Delivery => {
                    let node = &mut self.nodes[i];
                    if node.phase() == Phase::Terminated {
                        return Err(NodeError::LinkClosed {
                            from: event.from,
                            to: node.id(),
                        }
                        .into());
                    }
                    node.on_payload(&event.payload, now)?;
                }
                Class::Deadline => {
                    if self.deadlines[i] != Some(event.seq) {
                        continue;
                    }
                    if let Some(out) = self.nodes[i].on_timeout(now) {
                        self.deliver(i, out, now)?;
                    }
                }
            }
            self.deadlines[i] = None;
            self.settle(i, now)?;
        }

        let waiting: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.phase() != Phase::Terminated)
            .map(ProcessNode::id)
            .collect();
        if !waiting.is_empty() {
            return Err(SimError::Stalled { waiting });
        }

        let logs: Vec<_> = self.nodes.into_iter().map(ProcessNode::into_log).collect();
        let output = RunOutput::new(
            self.config.algorithm,
            logs,
            &self.config.params,
            started.elapsed(),
        );
        info!(
            virtual_us = now,
            entries = output.merged.entries().len(),
            average_payload_bytes = output.average_payload_bytes(),
            "lockstep run finished"
        );
        Ok(output)
    }

    /// Apply due transitions for node `i` and arm its next deadline.
    fn settle(&mut self, i: usize, now: u64) -> Result<(), SimError> {
        for out in self.nodes[i].advance(now) {
            self.deliver(i, out, now)?;
        }
        if let Some(wait) = self.nodes[i].next_wait() {
            let wait_us = u64::try_from(wait.as_micros()).unwrap_or(u64::MAX);
            let at = now.saturating_add(wait_us);
            let id = self.nodes[i].id();
            let seq = self.queue.push(at, Class::Deadline, id, id, Payload::new());
            self.deadlines[i] = Some(seq);
        }
        Ok(())
    }

    fn deliver(&mut self, from: usize, out: Outgoing, now: u64) -> Result<(), SimError> {
        let from = self.nodes[from].id();
        let target = self
            .nodes
            .get(out.to.index())
            .ok_or(NodeError::UnknownNeighbor { from, to: out.to })?;
        if target.phase() == Phase::Terminated {
            return Err(NodeError::LinkClosed { from, to: out.to }.into());
        }
        let at = now.saturating_add(self.latency_us);
        trace!(
            from = %from,
            to = %out.to,
            at,
            marker = out.is_termination(),
            "scheduled delivery"
        );
        self.queue.push(
            at,
            Class::Delivery,
            out.to,
            from,
            out.payload,
        );
        Ok(())
    }
}
