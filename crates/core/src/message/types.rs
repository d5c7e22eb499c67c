#![warn(missing_docs)]
//! This module defines the messages exchanged between virtual nodes.
//! Most of the messages follow the Send/Report pattern, where there is a one-to-one correspondence between them.

use serde::Deserialize;
use serde::Serialize;

use crate::dhash::StoredObject;
use crate::dht::Did;
use crate::dht::TopoInfo;

/// What the owner of a routed key should do once reached.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum FindSuccessorThen {
    /// Only report who the owner is.
    Report,
    /// Report the owner, as checked by the owner itself.
    Join,
    /// Store the value at the owner.
    Store(Vec<u8>),
    /// Fetch the value stored at the owner.
    Fetch,
}

/// What the owner did, reported to the origin.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum FindSuccessorReportHandler {
    /// The owner is `owner`.
    Successor,
    /// The value was stored.
    Stored(Vec<u8>),
    /// The value found, if any.
    Fetched(Option<Vec<u8>>),
}

/// MessageType use to find successor in a chord ring.
/// It travels hop by hop until it reaches a node that knows the owner.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorSend {
    /// correlation id of the pending operation
    pub txn: u64,
    /// did of target
    pub key: Did,
    /// action on the owner
    pub then: FindSuccessorThen,
    /// vnode waiting for the report
    pub origin: Did,
    /// hops done so far
    pub hops: u32,
    /// hops that failed to deliver so far
    pub retries: u32,
    /// sender believes the receiver owns the key
    pub final_hop: bool,
}

/// MessageType use to report origin node with report message.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorReport {
    /// correlation id of the pending operation
    pub txn: u64,
    /// did of target
    pub key: Did,
    /// vnode responsible for the key
    pub owner: Did,
    /// what was done on the owner
    pub handler: FindSuccessorReportHandler,
}

/// Routing gave up, hop or retry budget exhausted.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorFailed {
    /// correlation id of the pending operation
    pub txn: u64,
    /// did of target
    pub key: Did,
}

/// Ask the successor for its predecessor and successor list.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct QueryForTopoInfoSend;

/// Answer of [QueryForTopoInfoSend].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct QueryForTopoInfoReport {
    /// topology of the successor
    pub info: TopoInfo,
}

/// MessageType use notify the successor about the predecessor inferred by current node.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NotifyPredecessorSend {
    /// The did of predecessor.
    pub did: Did,
}

/// Liveness probe sent to the predecessor. Only its failure to deliver matters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CheckPredecessor;

/// Snapshot of the sender's primary store, kept by the successor as backup.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SyncReplicas {
    /// every primary object of the sender
    pub objects: Vec<StoredObject>,
}

/// One freshly inserted object, kept by the successor as backup.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Replicate {
    /// the stored object
    pub object: StoredObject,
}

/// A joining vnode asks its successor for the keys it is now responsible for.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TransferKeysSend {
    /// join operation id
    pub txn: u64,
}

/// The successor accepted the joining vnode.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TransferKeysReport {
    /// join operation id
    pub txn: u64,
    /// handoff to ack once objects are installed
    pub handoff: u64,
    /// predecessor of the successor before the join
    pub predecessor: Option<Did>,
    /// successor list of the successor
    pub successors: Vec<Did>,
    /// copies of the objects the joining vnode now owns
    pub objects: Vec<StoredObject>,
}

/// The joining vnode does not fall right before the receiver.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TransferKeysReject {
    /// join operation id
    pub txn: u64,
    /// Predecessor of the rejecting vnode, the next one to ask when it lies after the joining vnode.
    pub predecessor: Option<Did>,
}

/// Objects given to a new predecessor.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HandoffObjects {
    /// handoff id
    pub handoff: u64,
    /// copies of the objects
    pub objects: Vec<StoredObject>,
}

/// Objects of a handoff are installed, the sender may drop them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HandoffAck {
    /// handoff id
    pub handoff: u64,
}

/// A leaving vnode gives its objects and predecessor to its successor.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LeaveHandoff {
    /// handoff id
    pub handoff: u64,
    /// predecessor of the leaving vnode
    pub predecessor: Option<Did>,
    /// every primary object of the leaving vnode
    pub objects: Vec<StoredObject>,
}

/// The successor took over a leaving vnode.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LeaveAck {
    /// handoff id
    pub handoff: u64,
}

/// Tell the predecessor of a leaving vnode to link to the next one.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SetSuccessor {
    /// vnode going away
    pub leaving: Did,
    /// its successor
    pub successor: Did,
}

/// Walk the ring through successors.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TraceRing {
    /// where the walk started and stops
    pub origin: Did,
    /// vnodes visited so far
    pub hops: u32,
}

/// A collection MessageType
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// Remote message of find successor send
    FindSuccessorSend(FindSuccessorSend),
    /// Remote message of find successor report
    FindSuccessorReport(FindSuccessorReport),
    /// Remote message of routing failure
    FindSuccessorFailed(FindSuccessorFailed),
    /// Remote message of query topology send
    QueryForTopoInfoSend(QueryForTopoInfoSend),
    /// Remote message of query topology report
    QueryForTopoInfoReport(QueryForTopoInfoReport),
    /// Remote message of notify predecessor
    NotifyPredecessorSend(NotifyPredecessorSend),
    /// Remote message of predecessor probe
    CheckPredecessor(CheckPredecessor),
    /// Remote message of replica snapshot
    SyncReplicas(SyncReplicas),
    /// Remote message of single replica
    Replicate(Replicate),
    /// Remote message of join key transfer send
    TransferKeysSend(TransferKeysSend),
    /// Remote message of join key transfer report
    TransferKeysReport(TransferKeysReport),
    /// Remote message of join key transfer rejection
    TransferKeysReject(TransferKeysReject),
    /// Remote message of objects handed to a new predecessor
    HandoffObjects(HandoffObjects),
    /// Remote message of handoff ack
    HandoffAck(HandoffAck),
    /// Remote message of leave handoff
    LeaveHandoff(LeaveHandoff),
    /// Remote message of leave ack
    LeaveAck(LeaveAck),
    /// Remote message of successor relink
    SetSuccessor(SetSuccessor),
    /// Remote message of ring trace
    TraceRing(TraceRing),
}

impl Message {
    /// Name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::FindSuccessorSend(_) => "FindSuccessorSend",
            Message::FindSuccessorReport(_) => "FindSuccessorReport",
            Message::FindSuccessorFailed(_) => "FindSuccessorFailed",
            Message::QueryForTopoInfoSend(_) => "QueryForTopoInfoSend",
            Message::QueryForTopoInfoReport(_) => "QueryForTopoInfoReport",
            Message::NotifyPredecessorSend(_) => "NotifyPredecessorSend",
            Message::CheckPredecessor(_) => "CheckPredecessor",
            Message::SyncReplicas(_) => "SyncReplicas",
            Message::Replicate(_) => "Replicate",
            Message::TransferKeysSend(_) => "TransferKeysSend",
            Message::TransferKeysReport(_) => "TransferKeysReport",
            Message::TransferKeysReject(_) => "TransferKeysReject",
            Message::HandoffObjects(_) => "HandoffObjects",
            Message::HandoffAck(_) => "HandoffAck",
            Message::LeaveHandoff(_) => "LeaveHandoff",
            Message::LeaveAck(_) => "LeaveAck",
            Message::SetSuccessor(_) => "SetSuccessor",
            Message::TraceRing(_) => "TraceRing",
        }
    }
}

/// A message in flight between two virtual nodes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    /// sending vnode
    pub from: Did,
    /// destination vnode
    pub to: Did,
    /// content
    pub data: Message,
}

impl MessagePayload {
    /// Wrap a message.
    pub fn new(from: Did, to: Did, data: Message) -> Self {
        Self { from, to, data }
    }
}
