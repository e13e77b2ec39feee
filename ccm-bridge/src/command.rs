//! Argument vectors for the ccm command line.
//!
//! Nothing here performs I/O. Every builder returns the full argv with the
//! program name first; values are discrete tokens and are never joined and
//! re-split.

use crate::config::{BridgeConfig, DseCredentials};
use crate::topology::{ClusterTopology, Engine, node_name};
use crate::version::CassVersion;

/// Where an `update_cluster_configuration` change lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigTarget {
    /// `cassandra.yaml`
    #[default]
    Cassandra,
    /// `dse.yaml`
    Dse,
}

/// Node-level switches flipped through `nodetool`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFeature {
    BinaryProtocol,
    Gossip,
}

/// Single-shot node actions without options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Pause,
    Resume,
    Decommission,
    Remove,
}

impl NodeAction {
    fn as_str(self) -> &'static str {
        match self {
            NodeAction::Pause => "pause",
            NodeAction::Resume => "resume",
            NodeAction::Decommission => "decommission",
            NodeAction::Remove => "remove",
        }
    }
}

const START_WAIT_FLAGS: [&str; 2] = ["--wait-other-notice", "--wait-for-binary-proto"];
const JMX_PORT_BASE: u32 = 7000;
const DEBUG_PORT_BASE: u32 = 2000;
const PORT_STRIDE: u32 = 100;

/// Builds ccm argument vectors from the bridge configuration
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    ip_prefix: String,
    use_git: bool,
    dse_credentials: DseCredentials,
    ssl_directory: String,
}

impl CommandBuilder {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            program: config.program.clone(),
            ip_prefix: config.ip_prefix(),
            use_git: config.use_git,
            dse_credentials: config.dse_credentials.clone(),
            ssl_directory: config.ssl_directory.to_string_lossy().into_owned(),
        }
    }

    fn command<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        std::iter::once(self.program.clone())
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    fn node_command<I, S>(&self, slot: u32, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = self.command([node_name(slot)]);
        argv.extend(args.into_iter().map(Into::into));
        argv
    }

    pub fn list(&self) -> Vec<String> {
        self.command(["list"])
    }

    pub fn status(&self) -> Vec<String> {
        self.command(["status"])
    }

    pub fn switch(&self, cluster_name: &str) -> Vec<String> {
        self.command(["switch", cluster_name])
    }

    pub fn remove(&self, cluster_name: &str) -> Vec<String> {
        self.command(["remove", cluster_name])
    }

    pub fn clear(&self) -> Vec<String> {
        self.command(["clear"])
    }

    /// `ccm create` for `topology`, named `cluster_name`.
    pub fn create(&self, cluster_name: &str, topology: &ClusterTopology) -> Vec<String> {
        let mut argv = self.command(["create", cluster_name, "-v"]);

        match &topology.engine {
            Engine::Cassandra(version) if self.use_git => {
                argv.push(format!("git:cassandra-{version}"));
            }
            Engine::Cassandra(version) => argv.push(version.to_string()),
            Engine::Dse(version) => {
                if self.use_git {
                    argv.push(format!("git:{version}"));
                } else {
                    argv.push(version.to_string());
                }
                argv.push("--dse".to_string());
                if let DseCredentials::UsernamePassword { username, password } =
                    &self.dse_credentials
                {
                    argv.push(format!("--dse-username={username}"));
                    argv.push(format!("--dse-password={password}"));
                }
            }
        }

        argv.extend([
            "-n".to_string(),
            topology.nodes_argument(),
            "-i".to_string(),
            self.ip_prefix.clone(),
            "-b".to_string(),
        ]);

        if topology.use_tls {
            argv.push(format!("--ssl={}", self.ssl_directory));
            if topology.use_client_auth {
                argv.push("--require_client_auth".to_string());
            }
        }

        argv
    }

    /// Tuning applied right after `create`; the keys differ across engine releases.
    pub fn create_updateconf(&self, cassandra_version: &CassVersion) -> Vec<String> {
        let mut pairs = vec![
            "--rt=10000",
            "read_request_timeout_in_ms:10000",
            "write_request_timeout_in_ms:10000",
            "request_timeout_in_ms:10000",
            "phi_convict_threshold:16",
            "hinted_handoff_enabled:false",
            "dynamic_snitch_update_interval_in_ms:1000",
            "native_transport_max_threads:1",
            "rpc_min_threads:1",
            "rpc_max_threads:1",
            "concurrent_reads:2",
            "concurrent_writes:2",
            "concurrent_compactors:1",
            "compaction_throughput_mb_per_sec:0",
            "key_cache_size_in_mb:0",
            "key_cache_save_period:0",
            "memtable_flush_writers:1",
            "max_hints_delivery_threads:1",
        ];

        if *cassandra_version < CassVersion::new(2, 0, 0) {
            pairs.extend([
                "reduce_cache_sizes_at:0",
                "reduce_cache_capacity_to:0",
                "flush_largest_memtables_at:0",
                "index_interval:512",
            ]);
        } else {
            pairs.extend(["cas_contention_timeout_in_ms:10000", "file_cache_size_in_mb:0"]);
        }

        if *cassandra_version < CassVersion::new(2, 1, 0) {
            pairs.push("in_memory_compaction_limit_in_mb:1");
        }

        let mut argv = self.command(["updateconf"]);
        argv.extend(pairs.into_iter().map(String::from));
        argv
    }

    /// One `key:value` argument per pair.
    pub fn update_configuration<K, V>(&self, pairs: &[(K, V)], target: ConfigTarget) -> Vec<String>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let subcommand = match target {
            ConfigTarget::Cassandra => "updateconf",
            ConfigTarget::Dse => "updatedseconf",
        };
        let mut argv = self.command([subcommand]);
        argv.extend(
            pairs
                .iter()
                .map(|(k, v)| format!("{}:{}", k.as_ref(), v.as_ref())),
        );
        argv
    }

    pub fn start_cluster<S: AsRef<str>>(&self, jvm_arguments: &[S]) -> Vec<String> {
        let mut argv = self.command(["start"]);
        push_start_flags(&mut argv, jvm_arguments);
        argv
    }

    pub fn stop_cluster(&self, is_kill: bool) -> Vec<String> {
        let mut argv = self.command(["stop"]);
        if is_kill {
            argv.push("--not-gently".to_string());
        }
        argv
    }

    /// `ccm add` for a new node in `slot`.
    pub fn add_node(&self, slot: u32, data_center: Option<&str>, is_dse: bool) -> Vec<String> {
        let mut argv = self.command([
            "add".to_string(),
            node_name(slot),
            "-b".to_string(),
            "-i".to_string(),
            format!("{}{slot}", self.ip_prefix),
            "-j".to_string(),
            (JMX_PORT_BASE + PORT_STRIDE * slot).to_string(),
            "-r".to_string(),
            (DEBUG_PORT_BASE + PORT_STRIDE * slot).to_string(),
        ]);
        if let Some(data_center) = data_center.filter(|dc| !dc.is_empty()) {
            argv.extend(["-d".to_string(), data_center.to_string()]);
        }
        if is_dse {
            argv.push("--dse".to_string());
        }
        argv
    }

    pub fn start_node<S: AsRef<str>>(&self, slot: u32, jvm_arguments: &[S]) -> Vec<String> {
        let mut argv = self.node_command(slot, ["start"]);
        push_start_flags(&mut argv, jvm_arguments);
        argv
    }

    pub fn stop_node(&self, slot: u32, is_kill: bool) -> Vec<String> {
        let mut argv = self.node_command(slot, ["stop"]);
        if is_kill {
            argv.push("--not-gently".to_string());
        }
        argv
    }

    pub fn node_action(&self, slot: u32, action: NodeAction) -> Vec<String> {
        self.node_command(slot, [action.as_str()])
    }

    pub fn toggle_node_feature(
        &self,
        slot: u32,
        feature: NodeFeature,
        enable: bool,
    ) -> Vec<String> {
        let operation = match (feature, enable) {
            (NodeFeature::BinaryProtocol, true) => "enablebinary",
            (NodeFeature::BinaryProtocol, false) => "disablebinary",
            (NodeFeature::Gossip, true) => "enablegossip",
            (NodeFeature::Gossip, false) => "disablegossip",
        };
        self.node_command(slot, ["nodetool", operation])
    }

    /// The statement stays a single argument.
    pub fn execute_cql(&self, slot: u32, cql: &str) -> Vec<String> {
        self.node_command(slot, ["cqlsh", "-x", cql])
    }

    pub fn cassandra_version(&self, slot: u32) -> Vec<String> {
        self.node_command(slot, ["version"])
    }

    pub fn dse_version(&self, slot: u32) -> Vec<String> {
        self.node_command(slot, ["dse", "-v"])
    }
}

fn push_start_flags<S: AsRef<str>>(argv: &mut Vec<String>, jvm_arguments: &[S]) {
    argv.extend(START_WAIT_FLAGS.iter().map(|f| f.to_string()));
    if cfg!(windows) {
        argv.push("--quiet-windows".to_string());
    }
    argv.extend(
        jvm_arguments
            .iter()
            .map(AsRef::as_ref)
            .filter(|arg| !arg.is_empty())
            .map(|arg| format!("--jvm_arg={arg}")),
    );
}

/// Copy of `argv` safe for logs: DSE passwords are masked.
pub fn redact(argv: &[String]) -> Vec<String> {
    argv.iter()
        .map(|arg| match arg.strip_prefix("--dse-password=") {
            Some(_) => "--dse-password=***".to_string(),
            None => arg.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::DseVersion;

    fn builder() -> CommandBuilder {
        CommandBuilder::new(&BridgeConfig::default())
    }

    fn cassandra(v: &str) -> Engine {
        Engine::Cassandra(v.parse().unwrap())
    }

    #[test]
    fn test_create_single_dc() {
        let topology = ClusterTopology::new(1, 0, cassandra("3.4"));
        let argv = builder().create("cpp-driver_1_0_nodes", &topology);
        assert_eq!(
            argv,
            [
                "ccm",
                "create",
                "cpp-driver_1_0_nodes",
                "-v",
                "3.4",
                "-n",
                "1",
                "-i",
                "127.0.0.",
                "-b"
            ]
        );
    }

    #[test]
    fn test_create_two_dc_with_tls_and_client_auth() {
        let topology = ClusterTopology::new(2, 1, cassandra("2.1.12"))
            .with_tls(true)
            .with_client_auth(true);
        let argv = builder().create("x", &topology);
        assert!(argv.windows(2).any(|w| w == ["-n", "2:1"]));
        assert!(argv.contains(&"--ssl=ssl".to_string()));
        assert_eq!(argv.last().unwrap(), "--require_client_auth");
    }

    #[test]
    fn test_create_from_git() {
        let config = BridgeConfig {
            use_git: true,
            ..Default::default()
        };
        let topology = ClusterTopology::new(1, 0, cassandra("3.0.8"));
        let argv = CommandBuilder::new(&config).create("x", &topology);
        assert_eq!(argv[4], "git:cassandra-3.0.8");
    }

    #[test]
    fn test_create_dse_with_credentials() {
        let config = BridgeConfig {
            dse_credentials: DseCredentials::UsernamePassword {
                username: "user".to_string(),
                password: "secret".to_string(),
            },
            ..Default::default()
        };
        let dse: DseVersion = "4.8.5".parse().unwrap();
        let topology = ClusterTopology::new(1, 0, Engine::Dse(dse));
        let argv = CommandBuilder::new(&config).create("x", &topology);
        assert_eq!(argv[4], "4.8.5");
        assert_eq!(argv[5], "--dse");
        assert_eq!(argv[6], "--dse-username=user");
        assert_eq!(argv[7], "--dse-password=secret");

        let logged = redact(&argv);
        assert_eq!(logged[7], "--dse-password=***");
    }

    #[test]
    fn test_create_dse_with_ini_credentials() {
        let config = BridgeConfig {
            dse_credentials: DseCredentials::IniFile,
            use_git: true,
            ..Default::default()
        };
        let dse: DseVersion = "5.0.1".parse().unwrap();
        let topology = ClusterTopology::new(1, 0, Engine::Dse(dse));
        let argv = CommandBuilder::new(&config).create("x", &topology);
        assert_eq!(argv[4], "git:5.0.1");
        assert!(!argv.iter().any(|a| a.starts_with("--dse-username")));
    }

    #[test]
    fn test_updateconf_branches_on_version() {
        let b = builder();

        let legacy = b.create_updateconf(&"1.2.19".parse().unwrap());
        assert!(legacy.contains(&"index_interval:512".to_string()));
        assert!(legacy.contains(&"in_memory_compaction_limit_in_mb:1".to_string()));
        assert!(!legacy.contains(&"file_cache_size_in_mb:0".to_string()));

        let two_oh = b.create_updateconf(&"2.0.17".parse().unwrap());
        assert!(two_oh.contains(&"file_cache_size_in_mb:0".to_string()));
        assert!(two_oh.contains(&"in_memory_compaction_limit_in_mb:1".to_string()));

        // "2.10" sorts before "2.2" as a string; numerically it is newer than 2.1
        let newer = b.create_updateconf(&"2.10".parse().unwrap());
        assert!(!newer.contains(&"in_memory_compaction_limit_in_mb:1".to_string()));
        assert_eq!(&newer[..2], ["ccm", "updateconf"]);
    }

    #[test]
    fn test_update_configuration_targets() {
        let b = builder();
        let argv = b.update_configuration(
            &[("enable_user_defined_functions", "true")],
            ConfigTarget::Cassandra,
        );
        assert_eq!(argv, ["ccm", "updateconf", "enable_user_defined_functions:true"]);

        let argv = b.update_configuration(
            &[("audit_logging_options.enabled", "true"), ("a", "b")],
            ConfigTarget::Dse,
        );
        assert_eq!(argv, ["ccm", "updatedseconf", "audit_logging_options.enabled:true", "a:b"]);
    }

    #[test]
    fn test_add_node() {
        let argv = builder().add_node(2, Some("dc2"), false);
        assert_eq!(
            argv,
            [
                "ccm", "add", "node2", "-b", "-i", "127.0.0.2", "-j", "7200", "-r", "2200", "-d",
                "dc2"
            ]
        );

        let argv = builder().add_node(5, Some(""), true);
        assert!(!argv.contains(&"-d".to_string()));
        assert_eq!(argv.last().unwrap(), "--dse");
    }

    #[test]
    fn test_start_and_stop() {
        let b = builder();
        let argv = b.start_node(3, &["-Dcassandra.test=true", ""]);
        assert_eq!(&argv[..3], ["ccm", "node3", "start"]);
        assert!(argv.contains(&"--wait-for-binary-proto".to_string()));
        assert_eq!(argv.last().unwrap(), "--jvm_arg=-Dcassandra.test=true");
        assert_eq!(argv.iter().filter(|a| a.starts_with("--jvm_arg")).count(), 1);

        let none: [&str; 0] = [];
        assert_eq!(&b.start_cluster(&none)[..2], ["ccm", "start"]);
        assert_eq!(b.stop_cluster(false), ["ccm", "stop"]);
        assert_eq!(b.stop_cluster(true), ["ccm", "stop", "--not-gently"]);
        assert_eq!(b.stop_node(1, true), ["ccm", "node1", "stop", "--not-gently"]);
    }

    #[test]
    fn test_node_commands() {
        let b = builder();
        assert_eq!(b.node_action(4, NodeAction::Decommission), ["ccm", "node4", "decommission"]);
        assert_eq!(
            b.toggle_node_feature(1, NodeFeature::Gossip, false),
            ["ccm", "node1", "nodetool", "disablegossip"]
        );
        assert_eq!(
            b.toggle_node_feature(1, NodeFeature::BinaryProtocol, true),
            ["ccm", "node1", "nodetool", "enablebinary"]
        );
        assert_eq!(
            b.execute_cql(2, "SELECT * FROM system.local; DROP TABLE x"),
            ["ccm", "node2", "cqlsh", "-x", "SELECT * FROM system.local; DROP TABLE x"]
        );
        assert_eq!(b.dse_version(1), ["ccm", "node1", "dse", "-v"]);
    }
}
