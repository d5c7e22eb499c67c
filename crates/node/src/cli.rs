//! Command line of `chord-run`.
use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "chord-run", about, version)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = LogLevel::Info, env = "CHORD_RUN_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// YAML config file. Flags below override it.
    #[arg(long, short = 'c', env = "CHORD_RUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Script of timestamped commands.
    #[arg(long, short = 's')]
    pub script: Option<PathBuf>,

    /// Number of simulated hosts.
    #[arg(long, short = 'n')]
    pub nodes: Option<usize>,

    /// Host used as entry point for joins.
    #[arg(long, short = 'b')]
    pub bootstrap: Option<u16>,

    #[arg(long)]
    pub network_base: Option<Ipv4Addr>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Run the script only, without the interactive prompt.
    #[arg(long)]
    pub no_interactive: bool,
}

impl Cli {
    /// Config file (or defaults), then flags on top.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::read_fs(path)?,
            None => Config::default(),
        };
        if let Some(script) = &self.script {
            config.script = Some(script.clone());
        }
        if let Some(nodes) = self.nodes {
            config.nodes = nodes;
        }
        if let Some(bootstrap) = self.bootstrap {
            config.bootstrap = bootstrap;
        }
        if let Some(base) = self.network_base {
            config.network_base = base;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.no_interactive {
            config.interactive = false;
        }
        if config.bootstrap as usize >= config.nodes {
            return Err(Error::BootstrapOutOfRange(config.bootstrap, config.nodes));
        }
        Ok(config)
    }
}
