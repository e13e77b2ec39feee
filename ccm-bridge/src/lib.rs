//! Drive [ccm](https://github.com/riptano/ccm) test clusters from a test
//! harness, on this machine or on a remote host over SSH.
//!
//! ```no_run
//! use ccm_bridge::{Bridge, BridgeConfig};
//!
//! # fn main() -> ccm_bridge::Result<()> {
//! let mut bridge = Bridge::new(BridgeConfig::default())?;
//! let topology = bridge.topology(3, 0);
//! bridge.create_cluster(&topology)?;
//! bridge.start_cluster::<&str>(&[])?;
//! println!("{}", bridge.cluster_contact_points(false)?);
//! # Ok(())
//! # }
//! ```

#![deny(unused_extern_crates)]
#![deny(unused_crate_dependencies)]
#![deny(unsafe_code)]

// used by the ccm-bridge binary
use clap as _;
use clap_verbosity_flag as _;
use colored as _;
use directories as _;
use eyre as _;
use tracing_subscriber as _;

#[cfg(test)]
use ccm_bridge_test_utils as _;
#[cfg(test)]
use tempfile as _;

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod poll;
pub mod reply;
pub mod slots;
#[cfg(feature = "remote")]
pub mod ssh;
pub mod status;
pub mod topology;
pub mod transport;
pub mod version;

pub use bridge::{ActiveCluster, ActiveClusterState, Bridge, ClusterPhase};
pub use command::{ConfigTarget, NodeAction, NodeFeature};
pub use config::{Authentication, BridgeConfig, Deployment, DseCredentials, RemoteConfig};
pub use error::{BridgeError, ConfigError, Result, TransportError};
pub use poll::PollPolicy;
pub use status::{ClusterStatus, NodeEntry, NodeState};
pub use topology::{ClusterTopology, Engine, NODE_LIMIT};
pub use transport::{CommandOutput, CommandTransport, LocalTransport};
pub use version::{CassVersion, DseVersion};
