use ccm_bridge::{CassVersion, DseVersion};
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    #[arg(
        long,
        global = true,
        env = "CCM_BRIDGE_CONFIG",
        help = "TOML configuration file. Defaults to config.toml in the user config directory, when present."
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Cassandra version for new clusters, e.g. 3.11.4")]
    pub cassandra_version: Option<CassVersion>,

    #[arg(long, global = true, help = "Use DataStax Enterprise instead of Apache Cassandra.")]
    pub dse: bool,

    #[arg(long, global = true, help = "DSE version for new clusters, e.g. 5.1.0")]
    pub dse_version: Option<DseVersion>,

    #[arg(long, global = true, help = "Build the engine from its git branch.")]
    pub git: bool,

    #[arg(long, global = true, help = "Prefix of the cluster names this bridge creates.")]
    pub prefix: Option<String>,

    #[arg(long, global = true, help = "Host nodes bind to; the last octet is replaced per node.")]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    #[clap(about = "Create a cluster, or switch to it if it already exists")]
    Create {
        #[arg(long, default_value_t = 1, help = "Nodes in the first data center.")]
        dc1: u32,
        #[arg(long, default_value_t = 0, help = "Nodes in the second data center.")]
        dc2: u32,
        #[arg(long, help = "Enable client-to-node TLS.")]
        ssl: bool,
        #[arg(long, requires = "ssl", help = "Require client certificates.")]
        client_auth: bool,
    },
    #[clap(about = "Start every node and wait for the cluster to come up")]
    Start {
        #[arg(long = "jvm-arg", help = "Extra JVM argument; may be repeated.")]
        jvm_args: Vec<String>,
    },
    #[clap(about = "Stop every node and wait for the cluster to go down")]
    Stop {
        #[arg(long, help = "Kill the nodes instead of stopping them gently.")]
        kill: bool,
    },
    #[clap(about = "Show the state of every node")]
    Status,
    #[clap(about = "Print the node addresses as a comma separated list")]
    ContactPoints {
        #[arg(long, help = "Only list nodes that are up.")]
        up_only: bool,
    },
    #[clap(about = "Make an existing cluster the active one")]
    Switch { name: String },
    #[clap(about = "Remove a cluster; the active one when no name is given")]
    Remove { name: Option<String> },
    #[clap(about = "Remove every cluster created with the configured prefix")]
    RemoveAll {
        #[arg(long, help = "Remove every cluster, whatever its name.")]
        all: bool,
    },
    #[clap(about = "Add a node in the next free slot without starting it")]
    AddNode {
        #[arg(long)]
        data_center: Option<String>,
    },
    #[clap(about = "Add a node and start it")]
    BootstrapNode {
        #[arg(long = "jvm-arg", help = "Extra JVM argument; may be repeated.")]
        jvm_args: Vec<String>,
        #[arg(long)]
        data_center: Option<String>,
    },
    #[clap(about = "Act on a single node")]
    Node {
        #[arg(help = "Node number, starting at 1.")]
        node: u32,
        #[command(subcommand)]
        action: NodeCommand,
    },
    #[clap(about = "Run a CQL statement through a node's cqlsh")]
    Cql { node: u32, statement: String },
    #[clap(about = "Set configuration keys on every node")]
    UpdateConf {
        #[arg(long, help = "Update dse.yaml instead of cassandra.yaml.")]
        dse: bool,
        #[arg(required = true, value_parser = parse_pair, help = "KEY:VALUE pairs.")]
        pairs: Vec<(String, String)>,
    },
    #[clap(about = "Print the engine version reported by the active cluster")]
    Version,
}

#[derive(clap::Subcommand, Debug)]
pub enum NodeCommand {
    Start {
        #[arg(long = "jvm-arg")]
        jvm_args: Vec<String>,
    },
    Stop,
    Kill,
    Pause,
    Resume,
    Decommission,
    Remove,
    DisableBinary,
    EnableBinary,
    DisableGossip,
    EnableGossip,
}

impl Command {
    /// Whether the command works on the cluster ccm currently has selected.
    pub fn needs_active_cluster(&self) -> bool {
        !matches!(
            self,
            Command::Create { .. }
                | Command::Switch { .. }
                | Command::RemoveAll { .. }
                | Command::Remove { name: Some(_) }
        )
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY:VALUE, got `{s}`")),
    }
}
