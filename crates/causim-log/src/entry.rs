//! A single logged event and its text rendering.

use std::fmt;

use causim_core::{NodeId, VectorClock};

/// What a node did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pure internal event.
    Tick,
    /// Data message sent to a neighbor.
    Send,
    /// Data message received and merged.
    Recv,
    /// Termination marker sent to a neighbor.
    TermSend,
    /// Termination marker received.
    TermRecv,
}

impl EventKind {
    /// Whether the node applies Rule 1 right after logging this event.
    ///
    /// Termination markers are control signals and do not advance the
    /// clock.
    pub fn is_causal(self) -> bool {
        matches!(self, Self::Tick | Self::Send | Self::Recv)
    }
}

/// One line of a node's log.
///
/// `clock` is the node's vector clock at the moment of logging: after the
/// receive-merge for `Recv`, before the Rule 1 increment for every causal
/// kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Event kind.
    pub kind: EventKind,
    /// Microseconds since simulation start.
    pub offset_us: u64,
    /// Clock snapshot.
    pub clock: VectorClock,
    /// Acting node.
    pub node: NodeId,
    /// Peer for `Send`, `Recv` and `TermSend`; `None` otherwise.
    pub peer: Option<NodeId>,
    /// Encoded payload size in bytes; non-zero only for `Send`.
    pub payload_bytes: usize,
}

impl LogEntry {
    fn new(kind: EventKind, node: NodeId, offset_us: u64, clock: &VectorClock) -> Self {
        Self {
            kind,
            offset_us,
            clock: clock.clone(),
            node,
            peer: None,
            payload_bytes: 0,
        }
    }

    /// An internal event.
    pub fn tick(node: NodeId, offset_us: u64, clock: &VectorClock) -> Self {
        Self::new(EventKind::Tick, node, offset_us, clock)
    }

    /// A data send of `payload_bytes` to `peer`.
    pub fn send(
        node: NodeId,
        peer: NodeId,
        payload_bytes: usize,
        offset_us: u64,
        clock: &VectorClock,
    ) -> Self {
        Self {
            peer: Some(peer),
            payload_bytes,
            ..Self::new(EventKind::Send, node, offset_us, clock)
        }
    }

    /// A data receive from `peer`.
    pub fn recv(node: NodeId, peer: NodeId, offset_us: u64, clock: &VectorClock) -> Self {
        Self {
            peer: Some(peer),
            ..Self::new(EventKind::Recv, node, offset_us, clock)
        }
    }

    /// A termination marker sent to `peer`.
    pub fn term_send(node: NodeId, peer: NodeId, offset_us: u64, clock: &VectorClock) -> Self {
        Self {
            peer: Some(peer),
            ..Self::new(EventKind::TermSend, node, offset_us, clock)
        }
    }

    /// A termination marker received. The marker carries no sender.
    pub fn term_recv(node: NodeId, offset_us: u64, clock: &VectorClock) -> Self {
        Self::new(EventKind::TermRecv, node, offset_us, clock)
    }

    /// The acting node's own clock component in the snapshot.
    pub fn own_clock(&self) -> u32 {
        self.clock.own(self.node)
    }
}

struct Peer(Option<NodeId>);

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("?"),
        }
    }
}

impl fmt::Display for LogEntry {
    /// Renders the entry as one output line, without the newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.node;
        let peer = Peer(self.peer);
        let at = self.offset_us;
        match self.kind {
            EventKind::Tick => write!(
                f,
                "Process{id} executes internal event e{id}_{} at {at}",
                self.own_clock()
            )?,
            EventKind::Send => write!(
                f,
                "Process{id} sends message m{id}_{peer} to process{peer} at {at}"
            )?,
            EventKind::Recv => write!(
                f,
                "Process{id} receives message m{peer}_{id} from process{peer} at {at}"
            )?,
            EventKind::TermSend => write!(
                f,
                "Process{id} sends termination message to process{peer} at {at}"
            )?,
            EventKind::TermRecv => {
                write!(f, "Process{id} receives termination message at {at}")?
            }
        }
        write!(f, ", vc: {}", self.clock)
    }
}
