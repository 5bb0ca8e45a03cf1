//! The [`VectorClock`] value type.
//!
//! A vector clock holds one logical counter per node. Components are `u32`
//! because that is the integer width of the wire format; a clock never
//! grows or shrinks after construction.

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

use crate::id::NodeId;

/// Inline capacity for clock components.
///
/// Covers every topology up to 16 nodes without a heap allocation.
const INLINE_COMPONENTS: usize = 16;

/// A fixed-width vector of logical counters, one per node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct VectorClock {
    components: SmallVec<[u32; INLINE_COMPONENTS]>,
}

impl VectorClock {
    /// A zero clock for `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            components: SmallVec::from_elem(0, node_count),
        }
    }

    /// Build a clock from explicit component values.
    pub fn from_components(components: &[u32]) -> Self {
        Self {
            components: SmallVec::from_slice(components),
        }
    }

    /// Number of components (the node count).
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the clock has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Value of component `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        self.components[index]
    }

    /// Overwrite component `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        self.components[index] = value;
    }

    /// The component owned by `node`.
    #[inline]
    pub fn own(&self, node: NodeId) -> u32 {
        self.components[node.index()]
    }

    /// Rule 1: advance the component owned by `node` by one.
    #[inline]
    pub fn tick(&mut self, node: NodeId) {
        self.components[node.index()] += 1;
    }

    /// Component-wise view.
    pub fn as_slice(&self) -> &[u32] {
        &self.components
    }

    /// `true` when every component of `self` is `>=` the matching component
    /// of `other`. Clocks of different widths never dominate each other.
    pub fn dominates(&self, other: &VectorClock) -> bool {
        self.len() == other.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a >= b)
    }
}

impl PartialOrd for VectorClock {
    /// Happens-before partial order. Concurrent clocks compare as `None`.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.dominates(other), other.dominates(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => None,
        }
    }
}

impl fmt::Display for VectorClock {
    /// Renders as `[c0, c1, ..., ]`, trailing separator included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for c in &self.components {
            write!(f, "{c}, ")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_clock_is_zero() {
        let c = VectorClock::new(4);
        assert_eq!(c.len(), 4);
        assert!(c.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn tick_advances_only_own_component() {
        let mut c = VectorClock::new(3);
        c.tick(NodeId(1));
        c.tick(NodeId(1));
        assert_eq!(c.as_slice(), &[0, 2, 0]);
        assert_eq!(c.own(NodeId(1)), 2);
    }

    #[test]
    fn display_keeps_trailing_separator() {
        let c = VectorClock::from_components(&[1, 0, 3]);
        assert_eq!(c.to_string(), "[1, 0, 3, ]");
        assert_eq!(VectorClock::new(0).to_string(), "[]");
    }

    #[test]
    fn concurrent_clocks_are_unordered() {
        let a = VectorClock::from_components(&[2, 0]);
        let b = VectorClock::from_components(&[0, 1]);
        assert_eq!(a.partial_cmp(&b), None);
        let c = VectorClock::from_components(&[2, 1]);
        assert!(c > a);
        assert!(b < c);
    }

    #[test]
    fn width_mismatch_never_dominates() {
        let a = VectorClock::from_components(&[5, 5]);
        let b = VectorClock::from_components(&[1]);
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    proptest! {
        #[test]
        fn dominance_is_reflexive_and_transitive(
            a in proptest::collection::vec(0u32..10, 4),
            d1 in proptest::collection::vec(0u32..10, 4),
            d2 in proptest::collection::vec(0u32..10, 4),
        ) {
            let ca = VectorClock::from_components(&a);
            let b: Vec<u32> = a.iter().zip(&d1).map(|(x, y)| x + y).collect();
            let c: Vec<u32> = b.iter().zip(&d2).map(|(x, y)| x + y).collect();
            let cb = VectorClock::from_components(&b);
            let cc = VectorClock::from_components(&c);
            prop_assert!(ca.dominates(&ca));
            prop_assert!(cb.dominates(&ca));
            prop_assert!(cc.dominates(&cb));
            prop_assert!(cc.dominates(&ca));
        }
    }
}
