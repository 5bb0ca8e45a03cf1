//! Per-node state machine: `Running → Draining → Terminated`.
//!
//! [`ProcessNode`] owns everything one node needs: its vector clock, its
//! clock algorithm state, its RNG and its log. It never touches a channel or
//! a clock source. Runners feed it inbound payloads and timeouts stamped
//! with the current offset, and forward the [`Outgoing`] messages it
//! returns. The same node code therefore runs on OS threads and under the
//! virtual-time scheduler.
//!
//! # Driving a node
//!
//! ```text
//! loop {
//!     send every Outgoing from advance(now)
//!     if phase == Terminated { break }
//!     wait = next_wait() or the drain timeout
//!     match receive within wait {
//!         payload => on_payload(payload, now)
//!         timeout => send on_timeout(now), if any
//!     }
//! }
//! ```

use std::time::Duration;

use causim_clock::wire::is_termination;
use causim_clock::{AlgorithmKind, ClockAlgorithm, Payload};
use causim_core::{NodeError, NodeId, SimParams, VectorClock};
use causim_log::{EventLog, LogEntry};
use tracing::{debug, trace};

use crate::sampler::EventSampler;

/// Lifecycle phase. Transitions are linear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Generating events until the send quota is met.
    Running,
    /// Quota met and markers sent; waiting for a marker from every neighbor.
    Draining,
    /// All markers received; the log is final.
    Terminated,
}

/// Counts termination markers received against the node's degree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminationTracker {
    received: usize,
    expected: usize,
}

impl TerminationTracker {
    /// Tracker expecting one marker from each of `expected` neighbors.
    pub fn new(expected: usize) -> Self {
        Self {
            received: 0,
            expected,
        }
    }

    /// Count one marker.
    pub fn record(&mut self) {
        self.received += 1;
    }

    /// Markers received so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Markers needed to terminate.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Whether every neighbor has sent its marker.
    pub fn is_complete(&self) -> bool {
        self.received >= self.expected
    }
}

/// A message the node wants delivered. An empty payload is a termination
/// marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    /// Destination neighbor.
    pub to: NodeId,
    /// Encoded clock payload.
    pub payload: Payload,
}

impl Outgoing {
    /// Whether this is a termination marker.
    pub fn is_termination(&self) -> bool {
        is_termination(&self.payload)
    }
}

/// One simulated process.
pub struct ProcessNode {
    id: NodeId,
    neighbors: Vec<NodeId>,
    quota: usize,
    sent: usize,
    send_probability: f64,
    phase: Phase,
    vtime: VectorClock,
    algorithm: Box<dyn ClockAlgorithm>,
    sampler: EventSampler,
    termination: TerminationTracker,
    log: EventLog,
}

impl ProcessNode {
    /// Node `id` running `kind`, with its RNG derived from `seed`.
    pub fn new(
        id: NodeId,
        neighbors: Vec<NodeId>,
        params: &SimParams,
        kind: AlgorithmKind,
        seed: u64,
    ) -> Self {
        let algorithm = kind.build(id, params.node_count);
        Self::with_algorithm(id, neighbors, params, algorithm, seed)
    }

    /// Node `id` with an explicit algorithm instance.
    pub fn with_algorithm(
        id: NodeId,
        neighbors: Vec<NodeId>,
        params: &SimParams,
        algorithm: Box<dyn ClockAlgorithm>,
        seed: u64,
    ) -> Self {
        let termination = TerminationTracker::new(neighbors.len());
        Self {
            id,
            neighbors,
            quota: params.send_quota,
            sent: 0,
            send_probability: params.send_probability(),
            phase: Phase::Running,
            vtime: VectorClock::new(params.node_count),
            algorithm,
            sampler: EventSampler::new(seed, id, params.mean_interarrival_ms),
            termination,
            log: EventLog::new(id),
        }
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current vector clock.
    pub fn clock(&self) -> &VectorClock {
        &self.vtime
    }

    /// Successful sends so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Marker bookkeeping.
    pub fn termination(&self) -> &TerminationTracker {
        &self.termination
    }

    /// Log so far.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Apply any phase transition that is due at `now_us`.
    ///
    /// `Running → Draining` once the quota is met: returns one marker per
    /// neighbor and logs a `TermSend` for each, without a clock increment.
    /// `Draining → Terminated` once every marker has arrived. Call this
    /// before every wait, including the first.
    pub fn advance(&mut self, now_us: u64) -> Vec<Outgoing> {
        let mut out = Vec::new();
        if self.phase == Phase::Running && self.sent >= self.quota {
            self.phase = Phase::Draining;
            debug!(node = %self.id, sent = self.sent, "quota met, draining");
            out.reserve(self.neighbors.len());
            for &to in &self.neighbors {
                self.log
                    .record(LogEntry::term_send(self.id, to, now_us, &self.vtime));
                trace!(node = %self.id, to = %to, at = now_us, "term send");
                out.push(Outgoing {
                    to,
                    payload: Payload::new(),
                });
            }
        }
        if self.phase == Phase::Draining && self.termination.is_complete() {
            self.phase = Phase::Terminated;
            debug!(
                node = %self.id,
                entries = self.log.len(),
                "all termination markers received"
            );
        }
        out
    }

    /// Wait before the next local event, or `None` when not running.
    ///
    /// Draining nodes wait with the runner's drain timeout instead.
    pub fn next_wait(&mut self) -> Option<Duration> {
        match self.phase {
            Phase::Running => Some(self.sampler.next_wait()),
            Phase::Draining | Phase::Terminated => None,
        }
    }

    /// Handle an inbound payload received at `now_us`.
    ///
    /// An empty payload is a termination marker: counted and logged as
    /// `TermRecv`, clock untouched. Anything else is merged by the clock
    /// algorithm, logged as `Recv` and followed by the Rule 1 increment.
    pub fn on_payload(&mut self, payload: &[u8], now_us: u64) -> Result<(), NodeError> {
        debug_assert_ne!(self.phase, Phase::Terminated, "payload after termination");
        if is_termination(payload) {
            self.termination.record();
            self.log
                .record(LogEntry::term_recv(self.id, now_us, &self.vtime));
            trace!(
                node = %self.id,
                at = now_us,
                received = self.termination.received(),
                expected = self.termination.expected(),
                "term recv"
            );
            return Ok(());
        }

        let from = self
            .algorithm
            .merge(&mut self.vtime, payload)
            .map_err(|reason| NodeError::Wire {
                node: self.id,
                reason,
            })?;
        self.log
            .record(LogEntry::recv(self.id, from, now_us, &self.vtime));
        trace!(node = %self.id, from = %from, at = now_us, vc = %self.vtime, "recv");
        self.vtime.tick(self.id);
        Ok(())
    }

    /// Handle a wait that expired at `now_us` with nothing received.
    ///
    /// While running, either sends to a uniformly chosen neighbor (with
    /// probability `1 / (1 + a)`) or logs an internal event; both advance
    /// the clock. A drain timeout is not an event and logs nothing.
    pub fn on_timeout(&mut self, now_us: u64) -> Option<Outgoing> {
        if self.phase != Phase::Running {
            debug!(node = %self.id, at = now_us, "drain timeout");
            return None;
        }

        if !self.neighbors.is_empty() && self.sampler.should_send(self.send_probability) {
            let to = self.neighbors[self.sampler.pick(self.neighbors.len())];
            let payload = self.algorithm.construct(&self.vtime, to);
            self.log.record(LogEntry::send(
                self.id,
                to,
                payload.len(),
                now_us,
                &self.vtime,
            ));
            trace!(node = %self.id, to = %to, bytes = payload.len(), at = now_us, "send");
            self.sent += 1;
            self.vtime.tick(self.id);
            Some(Outgoing { to, payload })
        } else {
            self.log.record(LogEntry::tick(self.id, now_us, &self.vtime));
            trace!(node = %self.id, at = now_us, "internal event");
            self.vtime.tick(self.id);
            None
        }
    }

    /// Consume the node, handing off its log.
    pub fn into_log(self) -> EventLog {
        self.log
    }
}

impl std::fmt::Debug for ProcessNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessNode")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("algorithm", &self.algorithm.kind())
            .field("sent", &self.sent)
            .field("quota", &self.quota)
            .field("vtime", &self.vtime)
            .field("termination", &self.termination)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causim_log::EventKind;
    use causim_test_utils::MockClock;

    fn params(n: usize, a: f64, m: usize) -> SimParams {
        SimParams {
            node_count: n,
            mean_interarrival_ms: 1.0,
            send_bias: a,
            send_quota: m,
        }
    }

    fn node(a: f64, m: usize) -> ProcessNode {
        ProcessNode::new(
            NodeId(0),
            vec![NodeId(1), NodeId(2)],
            &params(3, a, m),
            AlgorithmKind::Naive,
            11,
        )
    }

    #[test]
    fn send_logs_pre_increment_snapshot() {
        // a = 0 sends on every timeout.
        let mut n = node(0.0, 3);
        assert!(n.advance(0).is_empty());
        let out = n.on_timeout(10).expect("send");
        assert!(!out.is_termination());
        assert_eq!(n.sent(), 1);
        assert_eq!(n.clock().own(NodeId(0)), 1);

        let entry = &n.log().entries()[0];
        assert_eq!(entry.kind, EventKind::Send);
        assert_eq!(entry.own_clock(), 0);
        assert_eq!(entry.payload_bytes, out.payload.len());
        assert_eq!(entry.peer, Some(out.to));
    }

    #[test]
    fn huge_bias_only_ticks() {
        let mut n = node(1e12, 1);
        for t in 0..20 {
            assert!(n.on_timeout(t).is_none());
        }
        assert_eq!(n.log().count(EventKind::Tick), 20);
        assert_eq!(n.clock().own(NodeId(0)), 20);
    }

    #[test]
    fn quota_triggers_markers_to_every_neighbor() {
        let mut n = node(0.0, 1);
        n.on_timeout(1);
        let clock_before = n.clock().clone();

        let markers = n.advance(2);
        assert_eq!(n.phase(), Phase::Draining);
        assert_eq!(markers.len(), 2);
        assert!(markers.iter().all(Outgoing::is_termination));
        assert_eq!(n.clock(), &clock_before);
        assert_eq!(n.log().count(EventKind::TermSend), 2);
        assert_eq!(n.next_wait(), None);

        // Transitions happen once.
        assert!(n.advance(3).is_empty());
    }

    #[test]
    fn terminates_after_marker_from_each_neighbor() {
        let mut n = node(0.0, 0);
        n.advance(0);
        assert_eq!(n.phase(), Phase::Draining);

        n.on_payload(&[], 5).unwrap();
        n.advance(5);
        assert_eq!(n.phase(), Phase::Draining);
        n.on_payload(&[], 6).unwrap();
        n.advance(6);
        assert_eq!(n.phase(), Phase::Terminated);

        assert_eq!(n.termination().received(), 2);
        assert_eq!(n.clock().own(NodeId(0)), 0);
        assert_eq!(n.log().count(EventKind::TermRecv), 2);
    }

    #[test]
    fn zero_quota_isolated_node_terminates_immediately() {
        let mut n = ProcessNode::new(NodeId(0), vec![], &params(1, 1.0, 0), AlgorithmKind::Sk, 0);
        assert!(n.advance(0).is_empty());
        assert_eq!(n.phase(), Phase::Terminated);
        assert!(n.into_log().is_empty());
    }

    #[test]
    fn recv_logs_post_merge_pre_increment_snapshot() {
        let p = params(3, 1.0, 5);
        let mut sender = ProcessNode::new(NodeId(1), vec![NodeId(0)], &p, AlgorithmKind::Sk, 0);
        let mut receiver = ProcessNode::new(NodeId(0), vec![NodeId(1)], &p, AlgorithmKind::Sk, 0);

        // Force a send from node 1 after a few local ticks.
        let out = loop {
            if let Some(out) = sender.on_timeout(0) {
                break out;
            }
        };
        let sender_own = sender.clock().own(NodeId(1)) - 1;

        receiver.on_payload(&out.payload, 50).unwrap();
        let entry = receiver.log().last().unwrap();
        assert_eq!(entry.kind, EventKind::Recv);
        assert_eq!(entry.peer, Some(NodeId(1)));
        assert_eq!(entry.clock.get(1), sender_own);
        assert_eq!(entry.own_clock(), 0);
        assert_eq!(receiver.clock().own(NodeId(0)), 1);
    }

    #[test]
    fn data_while_draining_is_merged_and_ticks() {
        let p = params(2, 0.0, 1);
        let mut sender = ProcessNode::new(NodeId(1), vec![NodeId(0)], &p, AlgorithmKind::Naive, 3);
        let mut n = ProcessNode::new(NodeId(0), vec![NodeId(1)], &p, AlgorithmKind::Naive, 3);

        n.on_timeout(1).expect("send");
        assert_eq!(n.advance(2).len(), 1);
        assert_eq!(n.phase(), Phase::Draining);
        let own_before = n.clock().own(NodeId(0));

        sender.on_timeout(0).expect("send");
        sender.on_timeout(1).expect("send");
        let late = sender.on_timeout(2).expect("send");
        n.on_payload(&late.payload, 3).unwrap();

        let entry = n.log().last().unwrap();
        assert_eq!(entry.kind, EventKind::Recv);
        assert_eq!(entry.peer, Some(NodeId(1)));
        assert_eq!(entry.own_clock(), own_before);
        assert_eq!(entry.clock.get(1), 2);
        assert_eq!(n.clock().own(NodeId(0)), own_before + 1);
        assert_eq!(n.phase(), Phase::Draining);

        n.on_payload(&[], 4).unwrap();
        n.advance(4);
        assert_eq!(n.phase(), Phase::Terminated);
        assert_eq!(n.clock().own(NodeId(0)), own_before + 1);
    }

    #[test]
    fn malformed_payload_is_a_node_error() {
        let mut n = node(1.0, 1);
        match n.on_payload(&[1, 2, 3], 0) {
            Err(NodeError::Wire { node, .. }) => assert_eq!(node, NodeId(0)),
            other => panic!("expected Wire, got {other:?}"),
        }
    }

    #[test]
    fn drain_timeout_logs_nothing() {
        let mut n = node(0.0, 0);
        n.advance(0);
        let before = n.log().len();
        assert!(n.on_timeout(1_000_000).is_none());
        assert_eq!(n.log().len(), before);
    }

    #[test]
    fn algorithm_sees_construct_and_merge_calls() {
        let mock = MockClock::new();
        let calls = mock.calls();
        let mut n = ProcessNode::with_algorithm(
            NodeId(0),
            vec![NodeId(1)],
            &params(2, 0.0, 1),
            Box::new(mock),
            0,
        );
        let out = n.on_timeout(0).unwrap();
        assert_eq!(out.payload, MockClock::PAYLOAD);
        n.on_payload(MockClock::PAYLOAD, 1).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.constructs, vec![NodeId(1)]);
        assert_eq!(calls.merges, 1);
    }
}
