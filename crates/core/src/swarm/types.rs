use ringsim_transport::HostId;
use serde::Deserialize;
use serde::Serialize;

use crate::consts::*;
use crate::dht::Did;
use crate::message::MessagePayload;

/// Tunables of the ring protocol, in simulated milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub hop_latency_ms: u64,
    pub request_timeout_ms: u64,
    pub max_request_retries: u32,
    pub max_hops: u32,
    pub operation_timeout_ms: u64,
    pub stabilize_interval_ms: u64,
    pub fix_finger_interval_ms: u64,
    pub successor_list_len: u8,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            hop_latency_ms: DEFAULT_HOP_LATENCY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_request_retries: DEFAULT_MAX_REQUEST_RETRIES,
            max_hops: DEFAULT_MAX_HOPS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            stabilize_interval_ms: DEFAULT_STABILIZE_INTERVAL_MS,
            fix_finger_interval_ms: DEFAULT_FIX_FINGER_INTERVAL_MS,
            successor_list_len: DEFAULT_SUCCESSOR_LIST_LEN,
        }
    }
}

/// Operations the harness can run against a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    InsertVNode(String),
    RemoveVNode(String),
    Lookup(String),
    Insert(String, String),
    Retrieve(String),
    DumpVNodeInfo(String),
    DumpDHashInfo,
    TraceRing(String),
    FixFinger(String),
    Detach,
    ReAttach,
    Crash,
    Restart,
}

impl Command {
    /// Name as typed in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertVNode(_) => "InsertVNode",
            Command::RemoveVNode(_) => "RemoveVNode",
            Command::Lookup(_) => "Lookup",
            Command::Insert(..) => "Insert",
            Command::Retrieve(_) => "Retrieve",
            Command::DumpVNodeInfo(_) => "DumpVNodeInfo",
            Command::DumpDHashInfo => "DumpDHashInfo",
            Command::TraceRing(_) => "TraceRing",
            Command::FixFinger(_) => "FixFinger",
            Command::Detach => "Detach",
            Command::ReAttach => "ReAttach",
            Command::Crash => "Crash",
            Command::Restart => "Restart",
        }
    }
}

/// Kind of an operation waiting for its routed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Lookup,
    Insert(Vec<u8>),
    Retrieve,
    /// Join of the vnode `did`, counting lookups done.
    Join { attempts: u32 },
    /// Refresh of one finger of the issuing vnode.
    FixFinger(usize),
}

/// An operation started and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub txn: u64,
    pub kind: OperationKind,
    pub key: Did,
    pub origin_host: HostId,
    /// Vnode the answer is routed back to.
    pub origin: Did,
    pub issued_at: u64,
    pub deadline: u64,
}

/// Work items of the simulation loop.
#[derive(Debug, Clone)]
pub(crate) enum Task {
    Command(HostId, Command),
    Deliver(MessagePayload),
    Undeliverable(MessagePayload),
    Stabilize(Did, u64),
    FixFingers(Did, u64),
    Expire(u64),
    LeaveTimeout(Did, u64),
}
