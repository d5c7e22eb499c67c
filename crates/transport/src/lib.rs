#![warn(missing_docs)]
//! A simulated shared LAN used by the ringsim DHT.
//!
//! Every physical host gets an IPv4 address from a base network and runs one
//! DHT application on a fixed port. Hosts can be detached from the medium
//! (link failure) or have their application crashed; delivery between two
//! hosts only succeeds while both are attached and running.
pub mod error;
pub mod network;

pub use network::AppState;
pub use network::Host;
pub use network::HostId;
pub use network::LinkState;
pub use network::SimNetwork;
