//! Cluster topology and the names derived from it.

use crate::error::BridgeError;
use crate::version::{CassVersion, DseVersion};

/// Maximum number of nodes (and node slots) in a bridge cluster.
pub const NODE_LIMIT: u32 = 6;

/// The database engine a cluster runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    Cassandra(CassVersion),
    Dse(DseVersion),
}

impl Engine {
    /// Version used for version-conditional command shapes.
    pub fn cassandra_version(&self) -> CassVersion {
        match self {
            Engine::Cassandra(v) => v.clone(),
            Engine::Dse(v) => v.cassandra_version(),
        }
    }

    pub fn is_dse(&self) -> bool {
        matches!(self, Engine::Dse(_))
    }
}

/// Node counts per data center plus security flags. Fixed once the cluster exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTopology {
    pub dc1_nodes: u32,
    pub dc2_nodes: u32,
    pub use_tls: bool,
    /// Only valid together with `use_tls`.
    pub use_client_auth: bool,
    pub engine: Engine,
}

impl ClusterTopology {
    pub fn new(dc1_nodes: u32, dc2_nodes: u32, engine: Engine) -> Self {
        Self {
            dc1_nodes,
            dc2_nodes,
            use_tls: false,
            use_client_auth: false,
            engine,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_client_auth(mut self, use_client_auth: bool) -> Self {
        self.use_client_auth = use_client_auth;
        self
    }

    pub fn node_count(&self) -> u32 {
        self.dc1_nodes + self.dc2_nodes
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        let invalid = |reason: &str| BridgeError::InvalidTopology {
            dc1: self.dc1_nodes,
            dc2: self.dc2_nodes,
            reason: reason.to_string(),
        };

        if self.dc1_nodes == 0 {
            return Err(invalid("data center one needs at least one node"));
        }
        if self.node_count() > NODE_LIMIT {
            return Err(invalid(&format!("more than {NODE_LIMIT} nodes")));
        }
        if self.use_client_auth && !self.use_tls {
            return Err(invalid("client authentication requires TLS"));
        }
        Ok(())
    }

    /// `<prefix>_<dc1>_<dc2>_nodes[_ssl][_auth]`
    pub fn cluster_name(&self, prefix: &str) -> String {
        let mut name = format!("{prefix}_{}_{}_nodes", self.dc1_nodes, self.dc2_nodes);
        if self.use_tls {
            name.push_str("_ssl");
        }
        if self.use_client_auth {
            name.push_str("_auth");
        }
        name
    }

    /// The `-n` argument of `ccm create`: `N1` or `N1:N2`.
    pub fn nodes_argument(&self) -> String {
        if self.dc2_nodes > 0 {
            format!("{}:{}", self.dc1_nodes, self.dc2_nodes)
        } else {
            self.dc1_nodes.to_string()
        }
    }
}

/// Node name ccm uses for a 1-based slot.
pub fn node_name(slot: u32) -> String {
    format!("node{slot}")
}

/// Inverse of [`node_name`].
pub fn slot_from_node_name(name: &str) -> Option<u32> {
    name.strip_prefix("node")?.parse().ok()
}

/// Whether `name` was generated for `prefix` by [`ClusterTopology::cluster_name`].
pub fn is_bridge_cluster(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| rest.contains("_nodes"))
}
