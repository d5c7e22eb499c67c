#![warn(missing_docs)]
use std::collections::HashMap;

use ringsim_transport::HostId;
use serde::Deserialize;
use serde::Serialize;

use super::PeerRing;
use crate::dhash::DHash;
use crate::dht::Did;

/// Lifecycle of a virtual node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VNodeState {
    /// Looking for its successor, not yet serving keys.
    Joining,
    /// Member of the ring.
    Stable,
    /// Handing its keys to the successor before going away.
    Leaving,
}

impl std::fmt::Display for VNodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            VNodeState::Joining => "Joining",
            VNodeState::Stable => "Stable",
            VNodeState::Leaving => "Leaving",
        };
        write!(f, "{s}")
    }
}

/// A `VirtualNode` is one addressable participant of the ring, bound to a physical host.
/// Several vnodes can share a host. The Did of a vnode is SHA-1 of its name.
#[derive(Debug, Clone)]
pub struct VirtualNode {
    /// Name given by the operator.
    pub name: String,
    /// Host running the vnode.
    pub host: HostId,
    /// Chord state.
    pub ring: PeerRing,
    /// Lifecycle state.
    pub state: VNodeState,
    /// Content store.
    pub store: DHash,
    /// Distinguishes timers of a vnode from those of an earlier vnode with the same Did.
    pub incarnation: u64,
    /// Predecessor found dead, reported as old predecessor once a new one shows up.
    pub lost_predecessor: Option<Did>,
    /// Keys copied to another vnode, dropped from primary once acked.
    pub handoffs: HashMap<u64, Vec<Did>>,
}

impl VirtualNode {
    /// Create a vnode in [VNodeState::Joining].
    pub fn new(name: &str, host: HostId, succ_max: u8, incarnation: u64) -> Self {
        let did = Did::from_name(name);
        Self {
            name: name.to_string(),
            host,
            ring: PeerRing::new(did, succ_max),
            state: VNodeState::Joining,
            store: DHash::new(),
            incarnation,
            lost_predecessor: None,
            handoffs: HashMap::new(),
        }
    }

    /// The did of the vnode.
    pub fn did(&self) -> Did {
        self.ring.did
    }

    /// Current successor, maybe stale.
    pub fn successor(&self) -> Did {
        self.ring.successor()
    }

    /// Current predecessor, maybe stale.
    pub fn predecessor(&self) -> Option<Did> {
        self.ring.predecessor
    }

    /// Test whether the vnode is responsible for `key`.
    pub fn contains(&self, key: Did) -> bool {
        self.ring.contains(key)
    }
}
