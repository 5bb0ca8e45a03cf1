//! Error types shared across the causim workspace.
//!
//! Organized by subsystem: the wire codec and the per-node worker. Both
//! describe broken internal invariants rather than user mistakes; user
//! input is rejected earlier as a configuration error.

use std::error::Error;
use std::fmt;

use crate::id::NodeId;

/// Errors from decoding a clock payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// The payload length does not fit the expected layout.
    BadLength {
        /// Length of the payload in bytes.
        len: usize,
        /// Description of the expected layout.
        expected: String,
    },
    /// A component index or sender id is outside `0..node_count`.
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Width of the receiving clock.
        node_count: usize,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength { len, expected } => {
                write!(f, "payload of {len} bytes, expected {expected}")
            }
            Self::IndexOutOfRange { index, node_count } => {
                write!(f, "index {index} out of range for {node_count} nodes")
            }
        }
    }
}

impl Error for WireError {}

/// Fatal errors raised by a node worker mid-run.
///
/// Any of these means an internal invariant was broken: the FIFO drain
/// protocol guarantees no node is sent to after it terminates, and every
/// payload on the wire was produced by a peer running the same algorithm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeError {
    /// A send targeted a neighbor whose mailbox is already closed.
    LinkClosed {
        /// Sending node.
        from: NodeId,
        /// Target node.
        to: NodeId,
    },
    /// A send targeted a node that is not a neighbor.
    UnknownNeighbor {
        /// Sending node.
        from: NodeId,
        /// Target node.
        to: NodeId,
    },
    /// Every inbound link closed before all termination markers arrived.
    MailboxDisconnected {
        /// The draining node.
        node: NodeId,
        /// Markers received so far.
        received: usize,
        /// Markers expected (the node's degree).
        expected: usize,
    },
    /// An inbound data payload could not be decoded.
    Wire {
        /// The receiving node.
        node: NodeId,
        /// The decode failure.
        reason: WireError,
    },
    /// The node stopped early because another node's worker failed.
    Aborted {
        /// The node that stopped.
        node: NodeId,
    },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkClosed { from, to } => {
                write!(f, "node {from} sent to node {to} after it terminated")
            }
            Self::UnknownNeighbor { from, to } => {
                write!(f, "node {from} has no link to node {to}")
            }
            Self::MailboxDisconnected {
                node,
                received,
                expected,
            } => write!(
                f,
                "node {node} lost all inbound links after {received} of {expected} termination markers"
            ),
            Self::Wire { node, reason } => {
                write!(f, "node {node} received a malformed payload: {reason}")
            }
            Self::Aborted { node } => {
                write!(f, "node {node} stopped after another node failed")
            }
        }
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Wire { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
