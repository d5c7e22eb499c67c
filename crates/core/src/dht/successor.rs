//! Successor list of a virtual node.
use serde::Deserialize;
use serde::Serialize;

use crate::dht::did::BiasId;
use crate::dht::Did;

/// A sequence of successors for a node on the ring.
/// It's necessary to have multiple successors to prevent a single point of failure.
/// Note the successors are in order of a clockwise distance from the node.
/// See also [super::did::BiasId].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessorSeq {
    /// Node did
    did: Did,
    /// Max successor num
    max: u8,
    /// Successors
    successors: Vec<Did>,
}

impl SuccessorSeq {
    pub fn new(did: Did, max: u8) -> Self {
        Self {
            did,
            max,
            successors: vec![],
        }
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.did, did)
    }

    pub fn contains(&self, did: &Did) -> bool {
        self.successors.contains(did)
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.successors.len() >= self.max as usize
    }

    pub fn get(&self, index: usize) -> Option<Did> {
        self.successors.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// The closest successor, or the node itself when the list is empty.
    pub fn min(&self) -> Did {
        self.successors.first().copied().unwrap_or(self.did)
    }

    /// The farthest successor, or the node itself when the list is empty.
    pub fn max(&self) -> Did {
        self.successors.last().copied().unwrap_or(self.did)
    }

    pub fn list(&self) -> Vec<Did> {
        self.successors.clone()
    }

    /// Insert a successor keeping clockwise order.
    /// Returns the did if it ends up in the list.
    pub fn update(&mut self, successor: Did) -> Option<Did> {
        if self.contains(&successor) || successor == self.did {
            return None;
        }

        if self.bias(successor) >= self.bias(self.max()) && self.is_full() {
            return None;
        }

        self.successors.push(successor);
        let origin = self.did;
        self.successors.sort_by_key(|s| origin.distance(*s));
        self.successors.truncate(self.max.into());
        if self.successors.contains(&successor) {
            Some(successor)
        } else {
            None
        }
    }

    pub fn extend(&mut self, succ_list: &[Did]) -> Vec<Did> {
        succ_list.iter().filter_map(|s| self.update(*s)).collect()
    }

    pub fn remove(&mut self, did: Did) {
        self.successors.retain(|&v| v != did);
    }

    pub fn clear(&mut self) {
        self.successors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::tests::gen_ordered_dids;

    #[test]
    fn test_successor_update() {
        let dids = gen_ordered_dids(6);

        let mut succ = SuccessorSeq::new(dids[0], 3);
        assert!(succ.is_empty());
        assert_eq!(succ.min(), dids[0]);

        succ.update(dids[2]);
        assert_eq!(succ.list(), dids[2..3]);

        succ.update(dids[3]);
        assert_eq!(succ.list(), dids[2..4]);

        succ.update(dids[4]);
        assert_eq!(succ.list(), dids[2..5]);
        assert!(succ.is_full());

        assert_eq!(succ.update(dids[5]), None);
        assert_eq!(succ.list(), dids[2..5]);

        assert_eq!(succ.update(dids[1]), Some(dids[1]));
        assert_eq!(succ.list(), dids[1..4]);
        assert_eq!(succ.min(), dids[1]);
        assert_eq!(succ.max(), dids[3]);

        // self is never a successor
        assert_eq!(succ.update(dids[0]), None);
    }

    #[test]
    fn test_successor_order_wraps() {
        let dids = gen_ordered_dids(4);

        let mut succ = SuccessorSeq::new(dids[2], 3);
        succ.extend(&[dids[0], dids[1], dids[3]]);
        assert_eq!(succ.list(), vec![dids[3], dids[0], dids[1]]);
    }

    #[test]
    fn test_successor_remove() {
        let dids = gen_ordered_dids(4);

        let mut succ = SuccessorSeq::new(dids[0], 3);
        assert_eq!(succ.extend(&dids[1..4]), dids[1..4]);

        succ.remove(dids[2]);
        assert_eq!(succ.list(), vec![dids[1], dids[3]]);
        succ.clear();
        assert!(succ.is_empty());
    }
}
