//! Hosts and link state of the simulated LAN.
use std::net::Ipv4Addr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// Index of a physical host, as used by harness commands.
pub type HostId = u16;

/// Whether a host is connected to the shared medium.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Frames can be sent and received.
    Attached,
    /// The host was removed from the channel, every frame is dropped.
    Detached,
}

/// Whether the DHT application of a host is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppState {
    /// The application answers messages.
    Running,
    /// The application was crashed and drops everything.
    Stopped,
}

/// One physical node of the LAN.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Index of the host.
    pub id: HostId,
    /// Address assigned from the base network.
    pub address: Ipv4Addr,
    /// Port the DHT application listens on.
    pub port: u16,
    /// Link state.
    pub link: LinkState,
    /// Application state.
    pub app: AppState,
}

impl Host {
    /// A host can talk to the network only if it is attached and running.
    pub fn is_online(&self) -> bool {
        self.link == LinkState::Attached && self.app == AppState::Running
    }
}

/// The shared LAN. Addresses are assigned in order starting at `base + 1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimNetwork {
    hosts: Vec<Host>,
}

impl SimNetwork {
    /// Create `count` hosts, all attached and running.
    pub fn new(count: usize, base: Ipv4Addr, port: u16) -> Result<Self> {
        if count == 0 {
            return Err(Error::EmptyNetwork);
        }
        if count > HostId::MAX as usize || u32::from(base) as u64 + count as u64 >= u32::MAX as u64
        {
            return Err(Error::AddressSpaceExhausted { base, count });
        }
        let hosts = (0..count)
            .map(|i| Host {
                id: i as HostId,
                address: Ipv4Addr::from(u32::from(base) + i as u32 + 1),
                port,
                link: LinkState::Attached,
                app: AppState::Running,
            })
            .collect();
        tracing::debug!("created network of {} hosts from {}", count, base);
        Ok(Self { hosts })
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Always false, a network has at least one host.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Get a host.
    pub fn host(&self, id: HostId) -> Result<&Host> {
        self.hosts.get(id as usize).ok_or(Error::HostNotFound(id))
    }

    fn host_mut(&mut self, id: HostId) -> Result<&mut Host> {
        self.hosts.get_mut(id as usize).ok_or(Error::HostNotFound(id))
    }

    /// Iterate all hosts in index order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    /// Address and port of the application on a host.
    pub fn endpoint(&self, id: HostId) -> Result<(Ipv4Addr, u16)> {
        let host = self.host(id)?;
        Ok((host.address, host.port))
    }

    /// Detach a host from the channel.
    /// Returns false if it was already detached.
    pub fn detach(&mut self, id: HostId) -> Result<bool> {
        let host = self.host_mut(id)?;
        if host.link == LinkState::Detached {
            return Ok(false);
        }
        host.link = LinkState::Detached;
        tracing::info!("host {} detached", id);
        Ok(true)
    }

    /// Attach a previously detached host.
    /// Returns false if the host was not detached.
    pub fn reattach(&mut self, id: HostId) -> Result<bool> {
        let host = self.host_mut(id)?;
        if host.link == LinkState::Attached {
            return Ok(false);
        }
        host.link = LinkState::Attached;
        tracing::info!("host {} reattached", id);
        Ok(true)
    }

    /// Stop the application of a host.
    /// Returns false if it was already stopped.
    pub fn crash(&mut self, id: HostId) -> Result<bool> {
        let host = self.host_mut(id)?;
        if host.app == AppState::Stopped {
            return Ok(false);
        }
        host.app = AppState::Stopped;
        tracing::info!("application on host {} crashed", id);
        Ok(true)
    }

    /// Start the application of a crashed host.
    /// Returns false if it was running.
    pub fn restart(&mut self, id: HostId) -> Result<bool> {
        let host = self.host_mut(id)?;
        if host.app == AppState::Running {
            return Ok(false);
        }
        host.app = AppState::Running;
        tracing::info!("application on host {} restarted", id);
        Ok(true)
    }

    /// Whether the host is attached and running.
    pub fn is_online(&self, id: HostId) -> bool {
        self.host(id).map(|h| h.is_online()).unwrap_or(false)
    }

    /// A frame from `from` reaches `to` only if both ends are online.
    /// Traffic that stays on one host needs the application to run but not the link.
    pub fn can_deliver(&self, from: HostId, to: HostId) -> bool {
        if from == to {
            return self
                .host(from)
                .map(|h| h.app == AppState::Running)
                .unwrap_or(false);
        }
        self.is_online(from) && self.is_online(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lan(n: usize) -> SimNetwork {
        SimNetwork::new(n, Ipv4Addr::new(10, 1, 1, 0), 2000).unwrap()
    }

    #[test]
    fn test_address_assignment() {
        let net = lan(3);
        assert_eq!(net.len(), 3);
        assert_eq!(
            net.endpoint(0).unwrap(),
            (Ipv4Addr::new(10, 1, 1, 1), 2000)
        );
        assert_eq!(net.host(2).unwrap().address, Ipv4Addr::new(10, 1, 1, 3));
        assert_eq!(net.host(3), Err(Error::HostNotFound(3)));
    }

    #[test]
    fn test_address_rolls_into_next_octet() {
        let net = lan(300);
        assert_eq!(
            net.host(255).unwrap().address,
            Ipv4Addr::new(10, 1, 2, 0)
        );
    }

    #[test]
    fn test_empty_network_rejected() {
        assert_eq!(
            SimNetwork::new(0, Ipv4Addr::new(10, 1, 1, 0), 2000).unwrap_err(),
            Error::EmptyNetwork
        );
    }

    #[test]
    fn test_detach_and_reattach() {
        let mut net = lan(2);
        assert!(net.can_deliver(0, 1));

        assert!(net.detach(1).unwrap());
        assert!(!net.detach(1).unwrap());
        assert!(!net.can_deliver(0, 1));
        assert!(!net.can_deliver(1, 0));
        // loopback still works on a detached host
        assert!(net.can_deliver(1, 1));

        assert!(net.reattach(1).unwrap());
        assert!(!net.reattach(1).unwrap());
        assert!(net.can_deliver(0, 1));
    }

    #[test]
    fn test_crash_and_restart() {
        let mut net = lan(2);
        assert!(net.crash(0).unwrap());
        assert!(!net.crash(0).unwrap());
        assert!(!net.can_deliver(0, 0));
        assert!(!net.can_deliver(1, 0));
        assert!(!net.is_online(0));

        assert!(net.restart(0).unwrap());
        assert!(!net.restart(0).unwrap());
        assert!(net.can_deliver(1, 0));
    }

    #[test]
    fn test_host_serialize() {
        let net = lan(1);
        let json = serde_json::to_string(net.host(0).unwrap()).unwrap();
        assert!(json.contains("\"10.1.1.1\""));
        assert!(json.contains("\"Attached\""));
    }
}
