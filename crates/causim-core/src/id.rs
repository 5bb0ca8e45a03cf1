//! Strongly-typed node identifier.

use std::fmt;

/// Identifies a process node within a simulation.
///
/// Nodes are numbered `0..n` at topology construction. `NodeId(k)` is also
/// the index of that node's own component in every [`VectorClock`](crate::VectorClock).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The node id as a vector index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_display_agree() {
        let id = NodeId(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(NodeId::from(7), id);
    }
}
