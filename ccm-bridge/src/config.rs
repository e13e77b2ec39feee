//! Construction-time configuration for a [`Bridge`](crate::Bridge).
//!
//! Every field has a default, so an empty TOML file (or
//! `BridgeConfig::default()`) yields a local bridge for Cassandra 3.4 that
//! names its clusters `cpp-driver_*`.

use crate::error::ConfigError;
use crate::poll::PollPolicy;
use crate::version::{CassVersion, DseVersion};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CASSANDRA_VERSION: CassVersion = CassVersion {
    major: 3,
    minor: 4,
    patch: None,
    extra: None,
};
pub const DEFAULT_DSE_VERSION: DseVersion = DseVersion(CassVersion::new(4, 8, 5));
pub const DEFAULT_CLUSTER_PREFIX: &str = "cpp-driver";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_REMOTE_PORT: u16 = 22;
pub const DEFAULT_REMOTE_USERNAME: &str = "vagrant";
pub const DEFAULT_REMOTE_PASSWORD: &str = "vagrant";
pub const DEFAULT_PROGRAM: &str = "ccm";
pub const DEFAULT_SSL_DIRECTORY: &str = "ssl";

/// Main bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub cassandra_version: CassVersion,
    pub dse_version: DseVersion,
    /// Build the engine from its git repository instead of a release tarball.
    pub use_git: bool,
    pub use_dse: bool,
    pub cluster_prefix: String,
    pub dse_credentials: DseCredentials,
    /// Address of the ccm host; also the source of the node IP prefix.
    pub host: String,
    pub deployment: Deployment,
    /// Cluster-management executable.
    pub program: String,
    /// Keystore directory handed to `--ssl` for TLS clusters.
    pub ssl_directory: PathBuf,
    pub poll: PollPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cassandra_version: DEFAULT_CASSANDRA_VERSION,
            dse_version: DEFAULT_DSE_VERSION,
            use_git: false,
            use_dse: false,
            cluster_prefix: DEFAULT_CLUSTER_PREFIX.to_string(),
            dse_credentials: DseCredentials::default(),
            host: DEFAULT_HOST.to_string(),
            deployment: Deployment::Local,
            program: DEFAULT_PROGRAM.to_string(),
            ssl_directory: PathBuf::from(DEFAULT_SSL_DIRECTORY),
            poll: PollPolicy::default(),
        }
    }
}

/// How DSE download credentials are provided to ccm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DseCredentials {
    UsernamePassword { username: String, password: String },
    /// ccm reads the credentials from its own `.dse.ini`.
    IniFile,
}

impl Default for DseCredentials {
    fn default() -> Self {
        DseCredentials::UsernamePassword {
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Where ccm commands are executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Deployment {
    #[default]
    Local,
    Remote(RemoteConfig),
}

/// SSH settings for a remote deployment; the host is [`BridgeConfig::host`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub port: u16,
    pub username: String,
    pub authentication: Authentication,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_REMOTE_PORT,
            username: DEFAULT_REMOTE_USERNAME.to_string(),
            authentication: Authentication::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authentication {
    Password { password: String },
    PublicKey {
        public_key: PathBuf,
        private_key: PathBuf,
    },
}

impl Default for Authentication {
    fn default() -> Self {
        Authentication::Password {
            password: DEFAULT_REMOTE_PASSWORD.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BridgeConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_prefix.is_empty() {
            return Err(ConfigError::Invalid("cluster prefix must not be empty".into()));
        }
        if self.cluster_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "cluster prefix {:?} must not contain whitespace",
                self.cluster_prefix
            )));
        }
        if self.program.trim().is_empty() {
            return Err(ConfigError::Invalid("program must not be empty".into()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.poll.attempts == 0 {
            return Err(ConfigError::Invalid("poll attempts must be at least 1".into()));
        }

        if let Deployment::Remote(remote) = &self.deployment {
            if remote.username.is_empty() {
                return Err(ConfigError::Invalid("remote username must not be empty".into()));
            }
            if let Authentication::PublicKey {
                public_key,
                private_key,
            } = &remote.authentication
            {
                if public_key.as_os_str().is_empty() || private_key.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid(
                        "public key authentication needs both key files".into(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// The host address with its last octet removed, e.g. `127.0.0.`.
    pub fn ip_prefix(&self) -> String {
        match self.host.rfind('.') {
            Some(index) => self.host[..=index].to_string(),
            None => format!("{}.", self.host),
        }
    }
}
