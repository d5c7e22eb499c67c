#![warn(missing_docs)]
//! Implementation of Ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

mod chord;
pub mod did;
/// Finger table for Rings
pub mod finger;
/// Successor list of a vnode
#[allow(missing_docs)]
pub mod successor;
/// Virtual node, a ring participant bound to a host
pub mod vnode;

pub use chord::PeerRing;
pub use chord::PeerRingAction;
pub use chord::TopoInfo;
pub use did::Did;
pub use finger::FingerTable;
pub use successor::SuccessorSeq;
pub use vnode::VNodeState;
pub use vnode::VirtualNode;
