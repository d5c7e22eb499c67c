//! Events reported by the ring to whoever drives the simulation.
use std::net::Ipv4Addr;

use ringsim_transport::HostId;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::inspect::DHashInspect;
use crate::inspect::VNodeInspect;

/// Every observable outcome of the ring, in one tagged enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingEvent {
    JoinSuccess {
        name: String,
        key: Did,
    },
    LookupSuccess {
        key: Did,
        address: Ipv4Addr,
        port: u16,
    },
    LookupFailure {
        key: Did,
    },
    InsertSuccess {
        key: Did,
        value: Vec<u8>,
    },
    InsertFailure {
        key: Did,
        value: Vec<u8>,
    },
    RetrieveSuccess {
        key: Did,
        value: Vec<u8>,
    },
    RetrieveFailure {
        key: Did,
    },
    /// A vnode was found unreachable, or could not join.
    VNodeFailure {
        name: String,
        key: Did,
    },
    /// The interval `(predecessor_key, key]` owned by `name` changed.
    VNodeKeyOwnership {
        name: String,
        key: Did,
        predecessor_key: Did,
        old_predecessor_key: Option<Did>,
        predecessor_address: Ipv4Addr,
        predecessor_port: u16,
    },
    TraceRing {
        name: String,
        key: Did,
    },
    VNodeInfo(VNodeInspect),
    DHashInfo(DHashInspect),
    HostDetached {
        host: HostId,
    },
    HostReattached {
        host: HostId,
        success: bool,
    },
    HostCrashed {
        host: HostId,
    },
    HostRestarted {
        host: HostId,
    },
}

/// A [RingEvent] stamped with the simulated time it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub at_ms: u64,
    pub event: RingEvent,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl std::fmt::Display for RingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RingEvent::JoinSuccess { name, key } => {
                write!(f, "VNode: {name} Joined successfully\nKey: {key}")
            }
            RingEvent::LookupSuccess { key, address, port } => {
                write!(f, "Lookup Success Ip: {address} Port: {port}\nKey: {key}")
            }
            RingEvent::LookupFailure { key } => write!(f, "Key Lookup failed\nKey: {key}"),
            RingEvent::InsertSuccess { key, value } => {
                write!(f, "Insert Success! Key: {key} Value: {}", lossy(value))
            }
            RingEvent::InsertFailure { key, value } => {
                write!(
                    f,
                    "Insert Failure Reported... Key: {key} Value: {}",
                    lossy(value)
                )
            }
            RingEvent::RetrieveSuccess { key, value } => {
                write!(f, "Retrieve Success! Key: {key} Value: {}", lossy(value))
            }
            RingEvent::RetrieveFailure { key } => {
                write!(f, "Retrieve Failure Reported... Key: {key}")
            }
            RingEvent::VNodeFailure { name, key } => write!(f, "VNode: {name} Failed\nKey: {key}"),
            RingEvent::VNodeKeyOwnership {
                name,
                key,
                predecessor_key,
                old_predecessor_key,
                predecessor_address,
                predecessor_port,
            } => {
                writeln!(f, "VNode: {name} Key Space Ownership change reported")?;
                writeln!(
                    f,
                    "New predecessor Ip: {predecessor_address} Port: {predecessor_port}"
                )?;
                writeln!(f, "Key: {key}")?;
                writeln!(f, "Predecessor Key: {predecessor_key}")?;
                match old_predecessor_key {
                    Some(old) => write!(f, "Old Predecessor Key: {old}"),
                    None => write!(f, "Old Predecessor Key: none"),
                }
            }
            RingEvent::TraceRing { name, .. } => write!(f, "<{name}>"),
            RingEvent::VNodeInfo(info) => write!(f, "{info}"),
            RingEvent::DHashInfo(info) => write!(f, "{info}"),
            RingEvent::HostDetached { host } => write!(f, "Node {host} detached"),
            RingEvent::HostReattached { success: true, .. } => write!(f, "Reattach success"),
            RingEvent::HostReattached { success: false, .. } => write!(f, "Reattach failed"),
            RingEvent::HostCrashed { host } => write!(f, "Node {host} crashed"),
            RingEvent::HostRestarted { host } => write!(f, "Node {host} restarted"),
        }
    }
}

impl std::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "\nCurrent Simulation Time: {}\n{}", self.at_ms, self.event)
    }
}
