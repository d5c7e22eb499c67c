#![warn(missing_docs)]
//! This module provider [SwarmBuilder] and it's interface for
//! [Swarm]

use std::collections::HashMap;
use std::collections::HashSet;
use std::net::Ipv4Addr;

use ringsim_transport::HostId;
use ringsim_transport::SimNetwork;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;
use crate::sched::Scheduler;
use crate::swarm::EventRecord;
use crate::swarm::RingConfig;
use crate::swarm::Swarm;

/// Creates a SwarmBuilder to configure a Swarm.
pub struct SwarmBuilder {
    config: RingConfig,
    hosts: usize,
    base_address: Ipv4Addr,
    port: u16,
    bootstrap: HostId,
    events: UnboundedSender<EventRecord>,
}

impl SwarmBuilder {
    /// Creates new instance of [SwarmBuilder], reporting events to `events`.
    pub fn new(events: UnboundedSender<EventRecord>) -> Self {
        SwarmBuilder {
            config: RingConfig::default(),
            hosts: 100,
            base_address: Ipv4Addr::new(10, 1, 1, 0),
            port: 2000,
            bootstrap: 10,
            events,
        }
    }

    /// Sets up the protocol tunables.
    pub fn config(mut self, config: RingConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets up the number of physical hosts.
    pub fn hosts(mut self, hosts: usize) -> Self {
        self.hosts = hosts;
        self
    }

    /// Sets up the network address host `i` gets `base + i + 1` from.
    pub fn base_address(mut self, base: Ipv4Addr) -> Self {
        self.base_address = base;
        self
    }

    /// Sets up the port every DHT application listens on.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets up the host whose vnodes are preferred as join entry point.
    pub fn bootstrap(mut self, host: HostId) -> Self {
        self.bootstrap = host;
        self
    }

    /// Try build for `Swarm`.
    pub fn build(self) -> Result<Swarm> {
        let network = SimNetwork::new(self.hosts, self.base_address, self.port)?;
        // an out of range bootstrap host is a config error
        network.host(self.bootstrap)?;
        tracing::info!(
            "ring of {} hosts from {}, bootstrap node {}",
            self.hosts,
            self.base_address,
            self.bootstrap
        );
        Ok(Swarm {
            config: self.config,
            network,
            bootstrap: self.bootstrap,
            vnodes: HashMap::new(),
            directory: HashMap::new(),
            crashed: HashMap::new(),
            reported: HashSet::new(),
            pending: HashMap::new(),
            sched: Scheduler::new(),
            next_id: 0,
            events: self.events,
        })
    }
}
