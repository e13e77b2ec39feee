mod cli;

use ccm_bridge::{Bridge, BridgeConfig, ConfigTarget, Engine, NodeState};
use cli::{Cli, Command, NodeCommand};
use colored::Colorize;
use eyre::{Result, WrapErr};

fn main() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q when set, e.g. RUST_LOG="ccm_bridge=trace"
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&cli)?;
    let mut bridge = Bridge::new(config).wrap_err("failed to set up the ccm bridge")?;

    if cli.command.needs_active_cluster() && bridge.resume_active_cluster()?.is_none() {
        eyre::bail!(
            "ccm has no active cluster; run `ccm-bridge create` or `ccm-bridge switch` first"
        );
    }

    let outcome = run(&mut bridge, cli.command);
    bridge.finalize();
    outcome
}

fn run(bridge: &mut Bridge, command: Command) -> Result<()> {
    match command {
        Command::Create {
            dc1,
            dc2,
            ssl,
            client_auth,
        } => {
            let topology = bridge
                .topology(dc1, dc2)
                .with_tls(ssl)
                .with_client_auth(client_auth);
            if !bridge.create_cluster(&topology)? {
                eyre::bail!("unable to activate the existing cluster");
            }
            let name = bridge.active_cluster().unwrap_or_default();
            println!("{} {}", "active cluster".green(), name.bold());
        }
        Command::Start { jvm_args } => {
            ensure(bridge.start_cluster(&jvm_args)?, "cluster did not come up")?;
            println!("{}", "cluster is up".green());
        }
        Command::Stop { kill } => {
            ensure(bridge.stop_cluster(kill)?, "cluster did not go down")?;
            println!("{}", "cluster is down".green());
        }
        Command::Status => print_status(bridge)?,
        Command::ContactPoints { up_only } => {
            println!("{}", bridge.cluster_contact_points(!up_only)?);
        }
        Command::Switch { name } => {
            if !bridge.switch_cluster(&name)? {
                eyre::bail!("ccm does not know a cluster named {name}");
            }
            println!("{} {}", "active cluster".green(), name.bold());
        }
        Command::Remove { name } => bridge.remove_cluster(name.as_deref())?,
        Command::RemoveAll { all } => {
            for name in bridge.remove_all_clusters(all)? {
                println!("{} {name}", "removed".yellow());
            }
        }
        Command::AddNode { data_center } => {
            let node = bridge.add_node(data_center.as_deref())?;
            println!("{node}");
        }
        Command::BootstrapNode {
            jvm_args,
            data_center,
        } => {
            let node = bridge.bootstrap_node(&jvm_args, data_center.as_deref())?;
            println!("{node}");
        }
        Command::Node { node, action } => run_node(bridge, node, action)?,
        Command::Cql { node, statement } => {
            print!("{}", bridge.execute_cql_on_node(node, &statement)?);
        }
        Command::UpdateConf { dse, pairs } => {
            let target = if dse {
                ConfigTarget::Dse
            } else {
                ConfigTarget::Cassandra
            };
            bridge.update_cluster_configuration(&pairs, target)?;
        }
        Command::Version => match bridge.topology(1, 0).engine {
            Engine::Dse(_) => println!("{}", bridge.get_dse_version()?),
            Engine::Cassandra(_) => println!("{}", bridge.get_cassandra_version()?),
        },
    }

    Ok(())
}

fn run_node(bridge: &mut Bridge, node: u32, action: NodeCommand) -> Result<()> {
    match action {
        NodeCommand::Start { jvm_args } => {
            ensure(bridge.start_node(node, &jvm_args)?, "node did not come up")?
        }
        NodeCommand::Stop => ensure(bridge.stop_node(node, false)?, "node did not go down")?,
        NodeCommand::Kill => ensure(bridge.kill_node(node)?, "node did not go down")?,
        NodeCommand::Pause => bridge.pause_node(node)?,
        NodeCommand::Resume => bridge.resume_node(node)?,
        NodeCommand::Decommission => {
            ensure(bridge.decommission_node(node)?, "node was not decommissioned")?
        }
        NodeCommand::Remove => bridge.remove_node(node)?,
        NodeCommand::DisableBinary => bridge.disable_node_binary_protocol(node)?,
        NodeCommand::EnableBinary => bridge.enable_node_binary_protocol(node)?,
        NodeCommand::DisableGossip => bridge.disable_node_gossip(node)?,
        NodeCommand::EnableGossip => bridge.enable_node_gossip(node)?,
    }
    Ok(())
}

fn print_status(bridge: &mut Bridge) -> Result<()> {
    let status = bridge.cluster_status()?;
    if let Some(name) = bridge.active_cluster() {
        println!("{}", name.bold());
    }
    for entry in &status.nodes {
        let state = match entry.state {
            NodeState::Up => "UP".green(),
            NodeState::Down => "DOWN".red(),
            NodeState::Uninitialized => "UNINITIALIZED".yellow(),
            NodeState::Decommissioned => "DECOMMISSIONED".dimmed(),
        };
        match entry.address {
            Some(address) => println!("{}: {state} ({address})", entry.name),
            None => println!("{}: {state}", entry.name),
        }
    }
    Ok(())
}

fn ensure(reached: bool, what: &str) -> Result<()> {
    if !reached {
        eyre::bail!("{what} before the readiness poll gave up");
    }
    Ok(())
}

/// File config (explicit, or the default location if it exists) with flags on top.
fn resolve_config(cli: &Cli) -> Result<BridgeConfig> {
    let path = cli.config.clone().or_else(|| {
        directories::ProjectDirs::from("", "", "ccm-bridge")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.exists())
    });

    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = ?path, "loading configuration");
            BridgeConfig::load_from_file(&path)?
        }
        None => BridgeConfig::default(),
    };

    if let Some(version) = &cli.cassandra_version {
        config.cassandra_version = version.clone();
    }
    if let Some(version) = &cli.dse_version {
        config.dse_version = version.clone();
    }
    if cli.dse {
        config.use_dse = true;
    }
    if cli.git {
        config.use_git = true;
    }
    if let Some(prefix) = &cli.prefix {
        config.cluster_prefix = prefix.clone();
    }
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    Ok(config)
}
