//! Error of ringsim_core

use crate::dht::Did;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in ringsim-core.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid hexadecimal did: {0}")]
    BadHexDid(String),

    #[error("Routing for {0} exceeded its hop or retry budget")]
    RoutingExhausted(Did),

    #[error("No value stored under {0}")]
    KeyAbsent(Did),

    #[error("Node {0} is unreachable")]
    NodeUnreachable(Did),

    #[error("VNode {0} not found")]
    VNodeNotFound(String),

    #[error("VNode {0} is not hosted on node {1}")]
    VNodeNotOnHost(String, u16),

    #[error("A vnode named {0} already exists")]
    VNodeNameExists(String),

    #[error("VNode {0} is {1}, expected Stable")]
    VNodeNotStable(String, String),

    #[error("Node {0} is not running its DHT application")]
    HostStopped(u16),

    #[error("Node {0} is detached from the network")]
    HostDetached(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] ringsim_transport::error::Error),
}
