//! Errors of ringsim-node.

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Unrecognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("Node {0} out of range, the network has {1} nodes")]
    HostOutOfRange(u16, usize),

    #[error("Bootstrap host {0} out of range for {1} nodes, pick one with --bootstrap")]
    BootstrapOutOfRange(u16, usize),

    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String),

    #[error("Failed to open {0}: {1}")]
    OpenFileError(String, String),

    #[error("Invalid config: {0}")]
    ConfigDecodeError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Ring error: {0}")]
    Ring(#[from] ringsim_core::error::Error),
}
