use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use ringsim_core::swarm::RingConfig;
use ringsim_transport::HostId;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

pub const DEFAULT_NODES: usize = 100;
pub const DEFAULT_BOOTSTRAP: HostId = 10;
pub const DEFAULT_NETWORK_BASE: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 0);
pub const DEFAULT_PORT: u16 = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Topology and pacing of one `chord-run` simulation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of simulated hosts.
    pub nodes: usize,
    /// Host preferred as entry point for joins.
    pub bootstrap: HostId,
    /// Address of host 0 is the one right after this base.
    pub network_base: Ipv4Addr,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
    /// Read commands from stdin while the simulation runs.
    pub interactive: bool,
    /// Simulated time advanced per tick of the event loop.
    pub poll_interval_ms: u64,
    pub ring: RingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES,
            bootstrap: DEFAULT_BOOTSTRAP,
            network_base: DEFAULT_NETWORK_BASE,
            port: DEFAULT_PORT,
            script: None,
            interactive: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ring: RingConfig::default(),
        }
    }
}

impl Config {
    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = path.as_ref();
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path)
            .map_err(|e| Error::OpenFileError(path.display().to_string(), e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}
