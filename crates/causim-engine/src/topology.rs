//! Undirected communication graph between nodes.

use std::error::Error;
use std::fmt;

use causim_core::NodeId;
use indexmap::IndexSet;

/// Errors from building a [`Topology`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// The graph has no nodes.
    Empty,
    /// An edge connects a node to itself.
    SelfLoop {
        /// The offending node.
        node: NodeId,
    },
    /// An edge endpoint is not in `0..node_count`.
    NodeOutOfRange {
        /// The offending endpoint.
        node: NodeId,
        /// Number of nodes in the graph.
        node_count: usize,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "topology has no nodes"),
            Self::SelfLoop { node } => write!(f, "self-loop on node {node}"),
            Self::NodeOutOfRange { node, node_count } => {
                write!(f, "node {node} out of range for {node_count} nodes")
            }
        }
    }
}

impl Error for TopologyError {}

/// Symmetric adjacency over node ids `0..node_count`.
///
/// Edges are stored once as `(low, high)` pairs in insertion order;
/// duplicates and reversed duplicates collapse. Neighbor lists are sorted
/// ascending so neighbor selection is reproducible under a fixed seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    node_count: usize,
    edges: IndexSet<(NodeId, NodeId)>,
    neighbors: Vec<Vec<NodeId>>,
}

impl Topology {
    /// Build a topology from an undirected edge list.
    pub fn new(node_count: usize, edges: &[(NodeId, NodeId)]) -> Result<Self, TopologyError> {
        if node_count == 0 {
            return Err(TopologyError::Empty);
        }
        let mut set = IndexSet::with_capacity(edges.len());
        for &(a, b) in edges {
            for node in [a, b] {
                if node.index() >= node_count {
                    return Err(TopologyError::NodeOutOfRange { node, node_count });
                }
            }
            if a == b {
                return Err(TopologyError::SelfLoop { node: a });
            }
            set.insert(if a < b { (a, b) } else { (b, a) });
        }

        let mut neighbors = vec![Vec::new(); node_count];
        for &(a, b) in &set {
            neighbors[a.index()].push(b);
            neighbors[b.index()].push(a);
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }

        Ok(Self {
            node_count,
            edges: set,
            neighbors,
        })
    }

    /// Every pair of distinct nodes connected.
    pub fn complete(node_count: usize) -> Result<Self, TopologyError> {
        let mut edges = Vec::with_capacity(node_count * node_count.saturating_sub(1) / 2);
        for a in 0..node_count as u32 {
            for b in a + 1..node_count as u32 {
                edges.push((NodeId(a), NodeId(b)));
            }
        }
        Self::new(node_count, &edges)
    }

    /// Node `i` connected to `i + 1 (mod n)`. Fewer than three nodes give a
    /// single edge (or none).
    pub fn ring(node_count: usize) -> Result<Self, TopologyError> {
        let edges: Vec<_> = (0..node_count as u32)
            .map(|i| (NodeId(i), NodeId((i + 1) % node_count as u32)))
            .filter(|(a, b)| a != b)
            .collect();
        Self::new(node_count, &edges)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Sorted neighbors of `node`.
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.neighbors[node.index()]
    }

    /// Number of neighbors of `node`.
    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors[node.index()].len()
    }

    /// Distinct undirected edges as `(low, high)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether `a` and `b` share an edge.
    pub fn are_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors
            .get(a.index())
            .is_some_and(|list| list.binary_search(&b).is_ok())
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count as u32).map(NodeId)
    }
}
