//! Crossbeam wiring for the realtime runner.
//!
//! Every node owns one unbounded inbound queue (its [`Mailbox`]). Each
//! neighbor holds a clone of that queue's sender in its [`Links`] table. A
//! crossbeam channel is FIFO across all senders, so messages on any one
//! link arrive in send order. Once every neighbor has dropped its links the
//! mailbox reports disconnection.

use std::time::Duration;

use causim_clock::Payload;
use causim_core::{NodeError, NodeId};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;

use crate::node::{Outgoing, TerminationTracker};
use crate::topology::Topology;

/// A node's unified inbound queue.
#[derive(Debug)]
pub struct Mailbox {
    node: NodeId,
    rx: Receiver<Payload>,
}

impl Mailbox {
    /// Wait up to `timeout` for the next payload.
    ///
    /// `Ok(None)` on timeout. Disconnection before every marker has arrived
    /// is a fatal [`NodeError::MailboxDisconnected`].
    pub fn recv_timeout(
        &self,
        timeout: Duration,
        termination: &TerminationTracker,
    ) -> Result<Option<Payload>, NodeError> {
        match self.rx.recv_timeout(timeout) {
            Ok(payload) => Ok(Some(payload)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(NodeError::MailboxDisconnected {
                node: self.node,
                received: termination.received(),
                expected: termination.expected(),
            }),
        }
    }

    /// Messages currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Outbound senders of one node, keyed by neighbor id in ascending order.
#[derive(Debug)]
pub struct Links {
    node: NodeId,
    senders: IndexMap<NodeId, Sender<Payload>>,
}

impl Links {
    /// Deliver `out` to its neighbor's mailbox.
    pub fn send(&self, out: Outgoing) -> Result<(), NodeError> {
        let tx = self
            .senders
            .get(&out.to)
            .ok_or(NodeError::UnknownNeighbor {
                from: self.node,
                to: out.to,
            })?;
        tx.send(out.payload).map_err(|_| NodeError::LinkClosed {
            from: self.node,
            to: out.to,
        })
    }

    /// Neighbor ids in ascending order.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.senders.keys().copied()
    }
}

/// One `(Mailbox, Links)` pair per node, indexed by node id.
pub fn build_channels(topology: &Topology) -> Vec<(Mailbox, Links)> {
    let (txs, rxs): (Vec<_>, Vec<_>) = topology
        .nodes()
        .map(|_| crossbeam_channel::unbounded::<Payload>())
        .unzip();

    topology
        .nodes()
        .zip(rxs)
        .map(|(node, rx)| {
            let senders = topology
                .neighbors(node)
                .iter()
                .map(|&peer| (peer, txs[peer.index()].clone()))
                .collect();
            (Mailbox { node, rx }, Links { node, senders })
        })
        .collect()
    // `txs` drops here; only neighbor-held clones keep mailboxes open.
}
