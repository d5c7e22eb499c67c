#![allow(missing_docs)]

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("Host {0} is not part of the network")]
    HostNotFound(u16),

    #[error("Cannot assign {count} addresses from base {base}")]
    AddressSpaceExhausted { base: std::net::Ipv4Addr, count: usize },

    #[error("Network must contain at least one host")]
    EmptyNetwork,
}
