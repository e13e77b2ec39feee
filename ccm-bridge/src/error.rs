//! Error types for the bridge.
//!
//! A command that could not be executed at all is a [`TransportError`]; a
//! command that ran but whose reply reports a failure is
//! [`BridgeError::ToolReportedFailure`]. Readiness that never arrives is not an
//! error: the readiness checks return `Ok(false)`.

use crate::status::StatusParseError;
use crate::version::VersionParseError;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("`{command}` reported a failure: {output}")]
    ToolReportedFailure { command: String, output: String },

    #[error("no free node slot: the node limit of {limit} has been reached")]
    Capacity { limit: u32 },

    #[error(transparent)]
    Parse(#[from] StatusParseError),

    #[error("no active cluster; create or switch to a cluster first")]
    NoActiveCluster,

    #[error("node {node} did not come up")]
    NodeNotReady { node: u32 },

    #[error("node {node} is outside of 1..={limit}")]
    InvalidNode { node: u32, limit: u32 },

    #[error("invalid topology {dc1}:{dc2}: {reason}")]
    InvalidTopology { dc1: u32, dc2: u32, reason: String },

    #[error("unable to determine the version from the active cluster: {output:?}")]
    Version {
        output: String,
        #[source]
        source: Option<VersionParseError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The command never produced a reply.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command")]
    EmptyCommand,

    #[error("failed to connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("ssh session failure: {0}")]
    Session(String),

    #[error("ssh authentication failed for user `{username}`")]
    Authentication { username: String },

    #[error("connection to the remote host was lost")]
    ConnectionLost,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "remote")]
impl From<ssh2::Error> for TransportError {
    fn from(e: ssh2::Error) -> Self {
        TransportError::Session(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("remote deployment requires ccm-bridge to be built with the `remote` feature")]
    RemoteUnsupported,
}
