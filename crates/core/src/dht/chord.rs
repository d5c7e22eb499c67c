//! Chord algorithm implement.
#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use super::did::BiasId;
use super::successor::SuccessorSeq;
use super::FingerTable;
use crate::consts::KEY_BITS;
use crate::dht::Did;

/// PeerRing holds the Chord state of a single virtual node.
/// All vnodes form a clockwise ring in the order of Did.
/// Neighbours are kept as Dids only, they are resolved through the registry of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRing {
    /// The did of current node.
    pub did: Did,
    /// [FingerTable] help node to find successor quickly.
    pub finger: FingerTable,
    /// The next nodes on the ring, closest first.
    pub successor_seq: SuccessorSeq,
    /// The did of previous node on the ring.
    pub predecessor: Option<Did>,
}

/// `PeerRing` use this to describe where a key should go next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerRingAction {
    /// Current node owns the key.
    Owner,
    /// The successor `did` owns the key.
    SuccessorOwns(Did),
    /// Ask `did` to keep on routing.
    Forward(Did),
    /// The key was sent here as final hop but belongs before us, give it to predecessor.
    Backward(Did),
}

/// Information about successor and predecessor
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
pub struct TopoInfo {
    /// Successor list
    pub successors: Vec<Did>,
    /// Predecessor
    pub predecessor: Option<Did>,
}

impl From<&PeerRing> for TopoInfo {
    fn from(dht: &PeerRing) -> TopoInfo {
        TopoInfo {
            successors: dht.successors().list(),
            predecessor: dht.predecessor,
        }
    }
}

impl PeerRing {
    /// Create a ring state with no neighbour.
    pub fn new(did: Did, succ_max: u8) -> Self {
        Self {
            did,
            finger: FingerTable::new(did, KEY_BITS),
            successor_seq: SuccessorSeq::new(did, succ_max),
            predecessor: None,
        }
    }

    /// Return successor sequence
    pub fn successors(&self) -> &SuccessorSeq {
        &self.successor_seq
    }

    /// The closest successor, self when none is known.
    pub fn successor(&self) -> Did {
        self.successor_seq.min()
    }

    /// Whether the node knows no other node.
    pub fn is_alone(&self) -> bool {
        self.successor() == self.did
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.did, did)
    }

    /// Test whether `key` lies in `(predecessor, did]`.
    /// A node whose predecessor is itself owns the whole ring, a node without predecessor claims nothing.
    pub fn contains(&self, key: Did) -> bool {
        match self.predecessor {
            Some(pred) => key.is_between_right_closed(pred, self.did),
            None => false,
        }
    }

    /// Record a node learned from any message: it may be a better finger or successor.
    pub fn join(&mut self, did: Did) {
        if did == self.did {
            return;
        }
        self.finger.join(did);
        self.successor_seq.update(did);
    }

    /// Forget a node found dead or gone.
    /// Returns true if it was the predecessor.
    pub fn remove(&mut self, did: Did) -> bool {
        self.finger.remove(did);
        self.successor_seq.remove(did);
        if self.successor_seq.is_empty() {
            if let Some(x) = self.finger.first() {
                self.successor_seq.update(x);
            }
        }
        if self.predecessor == Some(did) {
            self.predecessor = None;
            return true;
        }
        false
    }

    /// Best known next hop towards `key`, strictly between current node and `key`.
    /// Falls back to the successor.
    pub fn closest_preceding_finger(&self, key: Did) -> Did {
        let finger = self.finger.closest_predecessor(key);
        let succ = self.successor();
        if finger != self.did {
            // the finger table may be emptier than the successor list right after a join
            if succ.is_between(self.did, key) && self.bias(succ) > self.bias(finger) {
                return succ;
            }
            return finger;
        }
        succ
    }

    /// Decide what to do with a routed request for `key`.
    /// `final_hop` is set when the sender believed current node is the owner.
    pub fn find_successor(&self, key: Did, final_hop: bool) -> PeerRingAction {
        if self.contains(key) || self.is_alone() {
            return PeerRingAction::Owner;
        }
        if final_hop {
            return match self.predecessor {
                None => PeerRingAction::Owner,
                Some(pred) => PeerRingAction::Backward(pred),
            };
        }
        let succ = self.successor();
        if key.is_between_right_closed(self.did, succ) {
            return PeerRingAction::SuccessorOwns(succ);
        }
        let next = self.closest_preceding_finger(key);
        if next == self.did {
            PeerRingAction::SuccessorOwns(succ)
        } else {
            PeerRingAction::Forward(next)
        }
    }

    /// Handle notification from a node that thinks it is the predecessor of current node.
    /// Returns the replaced predecessor when `did` is accepted.
    pub fn notify(&mut self, did: Did) -> Option<Option<Did>> {
        if did == self.did {
            return None;
        }
        let accept = match self.predecessor {
            None => true,
            Some(pre) if pre == self.did => true,
            Some(pre) => did.is_between(pre, self.did),
        };
        if !accept {
            return None;
        }
        let old = self.predecessor.replace(did);
        self.finger.join(did);
        if self.is_alone() {
            self.successor_seq.update(did);
        }
        Some(old)
    }

    /// Take the topology of the successor into account, as in the stabilize step of Chord.
    /// Returns the successor to notify afterwards.
    pub fn stabilize(&mut self, from: Did, info: &TopoInfo) -> Did {
        if let Some(x) = info.predecessor {
            if x != self.did && x.is_between(self.did, from) {
                self.join(x);
            }
        }
        if self.successor() == from {
            // drop stale tail entries, the successor's own list replaces them
            self.successor_seq.clear();
            self.successor_seq.update(from);
        }
        let tail: Vec<Did> = info
            .successors
            .iter()
            .copied()
            .filter(|d| *d != self.did)
            .collect();
        self.successor_seq.extend(&tail);
        for s in info.successors.iter() {
            self.finger.join(*s);
        }
        self.successor()
    }

    /// Reset to a single-node ring owning everything.
    pub fn bootstrap(&mut self) {
        self.successor_seq.clear();
        self.predecessor = Some(self.did);
    }
}
