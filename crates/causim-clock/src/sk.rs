//! Singhal–Kshemkalyani direct-dependency vector clock.
//!
//! Each node remembers, per component, its own clock value when that
//! component last changed (`lu`), and per neighbor, its own clock value at
//! the last direct send (`ls`). A send to `Y` carries only the components
//! with `lu[j] >= ls[Y]`. Under FIFO links the receiver ends up with exactly
//! the clock a full-vector broadcast would have produced.

use causim_core::{NodeId, VectorClock, WireError};

use crate::algorithm::{AlgorithmKind, ClockAlgorithm};
use crate::wire::{decode_delta, encode_delta, DeltaEntries, Payload};

/// Delta broadcast with last-update / last-sent bookkeeping.
#[derive(Clone, Debug)]
pub struct SkClock {
    own: NodeId,
    node_count: usize,
    /// Own clock value at the last direct send, indexed by neighbor id.
    last_sent: Vec<u32>,
    /// Own clock value at the last update, indexed by component.
    last_update: Vec<u32>,
}

impl SkClock {
    /// Algorithm state for node `own` among `node_count` nodes.
    pub fn new(own: NodeId, node_count: usize) -> Self {
        Self {
            own,
            node_count,
            last_sent: vec![0; node_count],
            last_update: vec![0; node_count],
        }
    }

    /// `ls[neighbor]`.
    pub fn last_sent(&self, neighbor: NodeId) -> u32 {
        self.last_sent[neighbor.index()]
    }

    /// `lu[component]`.
    pub fn last_update(&self, component: usize) -> u32 {
        self.last_update[component]
    }
}

impl ClockAlgorithm for SkClock {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Sk
    }

    fn merge(&mut self, vtime: &mut VectorClock, payload: &[u8]) -> Result<NodeId, WireError> {
        let delta = decode_delta(payload, self.node_count)?;
        let now = vtime.own(self.own);
        for &(j, value) in &delta.entries {
            let j = j as usize;
            if value > vtime.get(j) {
                vtime.set(j, value);
                self.last_update[j] = now;
            }
        }
        Ok(delta.sender)
    }

    fn construct(&mut self, vtime: &VectorClock, target: NodeId) -> Payload {
        let now = vtime.own(self.own);
        self.last_update[self.own.index()] = now;

        let since = self.last_sent[target.index()];
        let entries: DeltaEntries = self
            .last_update
            .iter()
            .enumerate()
            .filter(|&(_, &lu)| lu >= since)
            .map(|(j, _)| (j as u32, vtime.get(j)))
            .collect();

        self.last_sent[target.index()] = now;
        encode_delta(&entries, self.own)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naive::NaiveClock;
    use crate::wire::{decode_delta, PAIR};
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[test]
    fn first_send_carries_every_component() {
        let mut sk = SkClock::new(NodeId(0), 4);
        let payload = sk.construct(&VectorClock::new(4), NodeId(1));
        assert_eq!(payload.len(), 5 * PAIR);
        assert_eq!(sk.last_sent(NodeId(1)), 0);
    }

    #[test]
    fn repeat_send_carries_only_fresh_components() {
        let mut sk = SkClock::new(NodeId(0), 4);
        let mut vtime = VectorClock::new(4);
        vtime.tick(NodeId(0));
        sk.construct(&vtime, NodeId(1));
        vtime.tick(NodeId(0));

        let payload = sk.construct(&vtime, NodeId(1));
        let delta = decode_delta(&payload, 4).unwrap();
        assert_eq!(delta.entries.as_slice(), &[(0, 2)]);
        assert_eq!(delta.sender, NodeId(0));
        assert_eq!(sk.last_sent(NodeId(1)), 2);
    }

    #[test]
    fn merge_marks_updated_components_at_local_time() {
        let mut sender = SkClock::new(NodeId(0), 3);
        let mut receiver = SkClock::new(NodeId(2), 3);

        let mut sender_time = VectorClock::from_components(&[5, 0, 0]);
        let payload = sender.construct(&sender_time, NodeId(2));
        sender_time.tick(NodeId(0));

        let mut vtime = VectorClock::from_components(&[1, 0, 7]);
        let from = receiver.merge(&mut vtime, &payload).unwrap();

        assert_eq!(from, NodeId(0));
        assert_eq!(vtime.as_slice(), &[5, 0, 7]);
        assert_eq!(receiver.last_update(0), 7);
        // Stale or equal values leave lu untouched.
        assert_eq!(receiver.last_update(1), 0);
    }

    #[test]
    fn update_is_forwarded_on_next_send_to_each_neighbor() {
        let mut relay = SkClock::new(NodeId(1), 3);
        let mut vtime = VectorClock::new(3);

        // Prime ls for both neighbors.
        relay.construct(&vtime, NodeId(0));
        vtime.tick(NodeId(1));
        relay.construct(&vtime, NodeId(2));
        vtime.tick(NodeId(1));

        // Learn about node 0's progress.
        let incoming = encode_delta(&[(0, 4)], NodeId(0));
        relay.merge(&mut vtime, &incoming).unwrap();
        vtime.tick(NodeId(1));

        for target in [NodeId(2), NodeId(0)] {
            let payload = relay.construct(&vtime, target);
            let delta = decode_delta(&payload, 3).unwrap();
            assert!(
                delta.entries.contains(&(0, 4)),
                "update missing from send to {target}"
            );
            vtime.tick(NodeId(1));
        }
    }

    // ── Equivalence with the naive clock ─────────────────────────

    #[derive(Clone, Debug)]
    enum Op {
        Local(usize),
        Send(usize, usize),
        Deliver(usize, usize),
    }

    fn arb_op(n: usize) -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..n).prop_map(Op::Local),
            (0..n, 0..n).prop_map(|(a, b)| Op::Send(a, b)),
            (0..n, 0..n).prop_map(|(a, b)| Op::Deliver(a, b)),
        ]
    }

    struct Replica {
        naive: Vec<NaiveClock>,
        sk: Vec<SkClock>,
        naive_time: Vec<VectorClock>,
        sk_time: Vec<VectorClock>,
        naive_links: Vec<Vec<VecDeque<Payload>>>,
        sk_links: Vec<Vec<VecDeque<Payload>>>,
    }

    impl Replica {
        fn new(n: usize) -> Self {
            Self {
                naive: (0..n).map(|i| NaiveClock::new(NodeId(i as u32), n)).collect(),
                sk: (0..n).map(|i| SkClock::new(NodeId(i as u32), n)).collect(),
                naive_time: vec![VectorClock::new(n); n],
                sk_time: vec![VectorClock::new(n); n],
                naive_links: vec![vec![VecDeque::new(); n]; n],
                sk_links: vec![vec![VecDeque::new(); n]; n],
            }
        }

        fn tick(&mut self, i: usize) {
            self.naive_time[i].tick(NodeId(i as u32));
            self.sk_time[i].tick(NodeId(i as u32));
        }

        fn apply(&mut self, op: &Op) {
            match *op {
                Op::Local(i) => self.tick(i),
                Op::Send(a, b) if a != b => {
                    let to = NodeId(b as u32);
                    let p = self.naive[a].construct(&self.naive_time[a], to);
                    self.naive_links[a][b].push_back(p);
                    let p = self.sk[a].construct(&self.sk_time[a], to);
                    self.sk_links[a][b].push_back(p);
                    self.tick(a);
                }
                Op::Deliver(a, b) if a != b => {
                    let (Some(np), Some(sp)) = (
                        self.naive_links[a][b].pop_front(),
                        self.sk_links[a][b].pop_front(),
                    ) else {
                        return;
                    };
                    let from = self.naive[b].merge(&mut self.naive_time[b], &np).unwrap();
                    assert_eq!(from, NodeId(a as u32));
                    let from = self.sk[b].merge(&mut self.sk_time[b], &sp).unwrap();
                    assert_eq!(from, NodeId(a as u32));
                    self.tick(b);
                }
                _ => {}
            }
        }
    }

    proptest! {
        #[test]
        fn sk_matches_naive_under_fifo_links(
            ops in proptest::collection::vec(arb_op(4), 1..200),
        ) {
            let mut r = Replica::new(4);
            for op in &ops {
                r.apply(op);
                for i in 0..4 {
                    prop_assert_eq!(&r.sk_time[i], &r.naive_time[i], "node {} after {:?}", i, op);
                }
            }
        }

        #[test]
        fn sk_payload_never_exceeds_full_delta(
            ops in proptest::collection::vec(arb_op(5), 1..150),
        ) {
            let mut r = Replica::new(5);
            for op in &ops {
                if let Op::Send(a, b) = *op {
                    if a != b {
                        let sent_before = r.sk_links[a][b].len();
                        r.apply(op);
                        let payload = &r.sk_links[a][b][sent_before];
                        prop_assert!(payload.len() <= (5 + 1) * PAIR);
                        continue;
                    }
                }
                r.apply(op);
            }
        }
    }
}
