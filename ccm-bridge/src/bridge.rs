//! Cluster and node lifecycle on top of a [`CommandTransport`].
//!
//! [`Bridge`] tracks which cluster is active and which node slots are in use,
//! and turns every operation into one or more ccm invocations. Readiness
//! checks poll `ccm status` under the configured [`PollPolicy`] and report
//! `false` when the cluster never gets there.

use crate::command::{CommandBuilder, ConfigTarget, NodeAction, NodeFeature, redact};
use crate::config::{BridgeConfig, Deployment};
use crate::error::{BridgeError, Result};
use crate::poll::{PollPolicy, poll_until};
use crate::reply::{self, ClusterList, ReplyKind};
use crate::slots::{NodeSlots, SlotState};
use crate::status::{ClusterStatus, NodeState};
use crate::topology::{
    ClusterTopology, Engine, NODE_LIMIT, is_bridge_cluster, node_name, slot_from_node_name,
};
use crate::transport::{CommandTransport, LocalTransport};
use crate::version::{CassVersion, DseVersion};

/// Where the active cluster is in its lifecycle, as far as the bridge knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterPhase {
    Created,
    Configured,
    Started,
    Stopped,
}

/// The cluster the bridge is currently driving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCluster {
    pub name: String,
    pub phase: ClusterPhase,
    /// Known when the cluster was created through this bridge.
    pub topology: Option<ClusterTopology>,
}

#[derive(Debug, Clone)]
pub struct ActiveClusterState {
    pub cluster: Option<ActiveCluster>,
    pub cassandra_version: CassVersion,
    pub dse_version: DseVersion,
}

/// Drives ccm on behalf of a test harness.
///
/// A bridge is used from one thread at a time; every method that talks to
/// ccm takes `&mut self` and blocks until the command and any readiness
/// polling are done.
pub struct Bridge {
    config: BridgeConfig,
    commands: CommandBuilder,
    transport: Box<dyn CommandTransport>,
    state: ActiveClusterState,
    slots: NodeSlots,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Build a bridge that runs ccm locally or over SSH, as configured.
    ///
    /// A remote session is not opened until the first command needs it.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let transport = transport_for(&config)?;
        Ok(Self::assemble(config, transport))
    }

    /// Build a bridge on a caller-supplied transport.
    pub fn with_transport(
        config: BridgeConfig,
        transport: impl CommandTransport + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, Box::new(transport)))
    }

    fn assemble(config: BridgeConfig, transport: Box<dyn CommandTransport>) -> Self {
        let commands = CommandBuilder::new(&config);
        let state = ActiveClusterState {
            cluster: None,
            cassandra_version: config.cassandra_version.clone(),
            dse_version: config.dse_version.clone(),
        };
        tracing::info!(
            cluster_prefix = %config.cluster_prefix,
            host = %config.host,
            use_dse = config.use_dse,
            "ccm bridge ready"
        );
        Self {
            config,
            commands,
            transport,
            state,
            slots: NodeSlots::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> &ActiveClusterState {
        &self.state
    }

    pub fn slots(&self) -> &NodeSlots {
        &self.slots
    }

    /// Name of the active cluster, if any.
    pub fn active_cluster(&self) -> Option<&str> {
        self.state.cluster.as_ref().map(|c| c.name.as_str())
    }

    /// Address prefix nodes live under, e.g. `127.0.0.` for `127.0.0.1`.
    pub fn ip_prefix(&self) -> String {
        self.config.ip_prefix()
    }

    /// Topology for the configured engine, without TLS.
    pub fn topology(&self, dc1_nodes: u32, dc2_nodes: u32) -> ClusterTopology {
        let engine = if self.config.use_dse {
            Engine::Dse(self.state.dse_version.clone())
        } else {
            Engine::Cassandra(self.state.cassandra_version.clone())
        };
        ClusterTopology::new(dc1_nodes, dc2_nodes, engine)
    }

    /// Run one ccm command and return its reply.
    ///
    /// A non-zero exit code or a reply that reads like a failure is turned
    /// into [`BridgeError::ToolReportedFailure`].
    pub fn execute_ccm_command(&mut self, argv: Vec<String>) -> Result<String> {
        self.run_ccm(argv, ReplyKind::Action)
    }

    /// Like [`Bridge::execute_ccm_command`], for commands whose reply is data
    /// (listings, status, query rows). Only a non-zero exit code or the
    /// tool's own crash output counts as a failure.
    pub fn execute_ccm_query(&mut self, argv: Vec<String>) -> Result<String> {
        self.run_ccm(argv, ReplyKind::Data)
    }

    fn run_ccm(&mut self, argv: Vec<String>, kind: ReplyKind) -> Result<String> {
        let shown = redact(&argv);
        tracing::debug!(command = ?shown, ?kind, "executing ccm command");

        let output = self.transport.execute(&argv)?;
        tracing::trace!(output = %output.output, "ccm replied");

        if !output.exited_cleanly() || reply::reports_failure(&output.output, kind) {
            tracing::error!(
                command = ?shown,
                exit_code = ?output.exit_code,
                "ccm reported a failure"
            );
            return Err(BridgeError::ToolReportedFailure {
                command: shown.join(" "),
                output: output.output,
            });
        }
        Ok(output.output)
    }

    /// Clusters ccm knows about, and which one it considers current.
    pub fn available_clusters(&mut self) -> Result<ClusterList> {
        let output = self.execute_ccm_query(self.commands.list())?;
        Ok(ClusterList::parse(&output))
    }

    /// Create the cluster for `topology`, or switch to it when it already
    /// exists. Returns `false` only when switching to it was not possible.
    pub fn create_cluster(&mut self, topology: &ClusterTopology) -> Result<bool> {
        topology.validate()?;
        let name = topology.cluster_name(&self.config.cluster_prefix);

        if self.available_clusters()?.contains(&name) {
            tracing::info!(cluster = %name, "cluster already exists, switching to it");
            let switched = self.switch_cluster(&name)?;
            if let Some(active) = self.state.cluster.as_mut().filter(|_| switched) {
                active.topology = Some(topology.clone());
            }
            return Ok(switched);
        }

        tracing::info!(cluster = %name, nodes = %topology.nodes_argument(), "creating cluster");
        self.execute_ccm_command(self.commands.create(&name, topology))?;

        // ccm makes a freshly created cluster the current one
        self.slots.reset();
        for slot in 1..=topology.node_count() {
            self.slots.set(slot, SlotState::Added);
        }
        self.state.cluster = Some(ActiveCluster {
            name,
            phase: ClusterPhase::Created,
            topology: Some(topology.clone()),
        });
        match &topology.engine {
            Engine::Cassandra(version) => self.state.cassandra_version = version.clone(),
            Engine::Dse(version) => self.state.dse_version = version.clone(),
        }

        let cassandra_version = topology.engine.cassandra_version();
        self.execute_ccm_command(self.commands.create_updateconf(&cassandra_version))?;
        self.set_phase(ClusterPhase::Configured);
        Ok(true)
    }

    /// Make `name` the active cluster. Returns `false` when ccm does not know it.
    pub fn switch_cluster(&mut self, name: &str) -> Result<bool> {
        let clusters = self.available_clusters()?;
        if !clusters.contains(name) {
            tracing::warn!(cluster = %name, "no such cluster");
            return Ok(false);
        }

        if clusters.active.as_deref() != Some(name) {
            self.execute_ccm_command(self.commands.switch(name))?;
        }
        self.adopt_cluster(name)?;
        Ok(true)
    }

    /// Pick up whatever cluster ccm already considers current, e.g. after a
    /// restart of the harness.
    pub fn resume_active_cluster(&mut self) -> Result<Option<String>> {
        let Some(name) = self.available_clusters()?.active else {
            tracing::debug!("ccm has no current cluster");
            return Ok(None);
        };
        self.adopt_cluster(&name)?;
        Ok(Some(name))
    }

    /// Rebuild the active-cluster record and slot table from `ccm status`.
    fn adopt_cluster(&mut self, name: &str) -> Result<()> {
        self.state.cluster = Some(ActiveCluster {
            name: name.to_string(),
            phase: ClusterPhase::Created,
            topology: None,
        });

        let status = self.cluster_status()?;
        self.slots.reset();
        for entry in &status.nodes {
            let Some(slot) = slot_from_node_name(&entry.name) else {
                continue;
            };
            let state = match entry.state {
                NodeState::Up => SlotState::Started,
                NodeState::Down => SlotState::Stopped,
                NodeState::Uninitialized => SlotState::Added,
                NodeState::Decommissioned => SlotState::Decommissioned,
            };
            self.slots.set(slot, state);
        }

        let phase = if !status.nodes_up.is_empty() {
            ClusterPhase::Started
        } else if !status.nodes_down.is_empty() {
            ClusterPhase::Stopped
        } else {
            ClusterPhase::Created
        };
        self.set_phase(phase);
        tracing::info!(
            cluster = %name,
            ?phase,
            nodes = status.node_count,
            "active cluster adopted"
        );
        Ok(())
    }

    /// Snapshot of the active cluster's nodes.
    pub fn cluster_status(&mut self) -> Result<ClusterStatus> {
        self.require_active()?;
        let output = self.execute_ccm_query(self.commands.status())?;
        Ok(ClusterStatus::parse(&output)?)
    }

    /// Poll until every non-decommissioned node is up.
    pub fn is_cluster_up(&mut self) -> Result<bool> {
        let policy = self.poll_policy();
        poll_until(&policy, "cluster up", || -> Result<bool> {
            Ok(self.cluster_status()?.all_up())
        })
    }

    /// Poll until no node is up.
    pub fn is_cluster_down(&mut self) -> Result<bool> {
        let policy = self.poll_policy();
        poll_until(&policy, "cluster down", || -> Result<bool> {
            Ok(self.cluster_status()?.all_down())
        })
    }

    /// Start every node and wait for the cluster to come up.
    pub fn start_cluster<S: AsRef<str>>(&mut self, jvm_arguments: &[S]) -> Result<bool> {
        let name = self.require_active()?.name.clone();
        tracing::info!(cluster = %name, "starting cluster");
        self.execute_ccm_command(self.commands.start_cluster(jvm_arguments))?;

        let up = self.is_cluster_up()?;
        if up {
            self.set_phase(ClusterPhase::Started);
            self.slots.set_members(SlotState::Started);
        }
        Ok(up)
    }

    /// Stop every node, forcibly when `is_kill`, and wait for the cluster to
    /// go down.
    pub fn stop_cluster(&mut self, is_kill: bool) -> Result<bool> {
        let name = self.require_active()?.name.clone();
        tracing::info!(cluster = %name, is_kill, "stopping cluster");
        self.execute_ccm_command(self.commands.stop_cluster(is_kill))?;

        let down = self.is_cluster_down()?;
        if down {
            self.set_phase(ClusterPhase::Stopped);
            self.slots.set_members(SlotState::Stopped);
        }
        Ok(down)
    }

    pub fn kill_cluster(&mut self) -> Result<bool> {
        self.stop_cluster(true)
    }

    /// Stop the cluster and wipe node data, keeping the cluster definition.
    pub fn clear_cluster_data(&mut self) -> Result<()> {
        self.require_active()?;
        self.execute_ccm_command(self.commands.clear())?;
        self.set_phase(ClusterPhase::Created);
        self.slots.set_members(SlotState::Added);
        Ok(())
    }

    /// Remove `name`, or the active cluster when `None`.
    pub fn remove_cluster(&mut self, name: Option<&str>) -> Result<()> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.require_active()?.name.clone(),
        };
        tracing::info!(cluster = %name, "removing cluster");
        self.execute_ccm_command(self.commands.remove(&name))?;

        if self.active_cluster() == Some(name.as_str()) {
            self.state.cluster = None;
            self.slots.reset();
        }
        Ok(())
    }

    /// Remove every cluster this bridge's prefix created, or every cluster
    /// ccm knows about when `is_all`. Returns the removed names.
    pub fn remove_all_clusters(&mut self, is_all: bool) -> Result<Vec<String>> {
        let prefix = self.config.cluster_prefix.clone();
        let doomed: Vec<String> = self
            .available_clusters()?
            .clusters
            .into_iter()
            .filter(|name| is_all || is_bridge_cluster(name, &prefix))
            .collect();

        for name in &doomed {
            self.remove_cluster(Some(name))?;
        }
        Ok(doomed)
    }

    /// Set `cassandra.yaml` (or `dse.yaml`) keys on every node.
    pub fn update_cluster_configuration<K, V>(
        &mut self,
        pairs: &[(K, V)],
        target: ConfigTarget,
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.require_active()?;
        if pairs.is_empty() {
            return Ok(());
        }
        self.execute_ccm_command(self.commands.update_configuration(pairs, target))?;
        Ok(())
    }

    /// Addresses of up nodes, or of every non-decommissioned node when `is_all`.
    pub fn cluster_ip_addresses(&mut self, is_all: bool) -> Result<Vec<String>> {
        Ok(self.cluster_status()?.ip_addresses(is_all))
    }

    /// [`Bridge::cluster_ip_addresses`] joined for a driver's contact points.
    pub fn cluster_contact_points(&mut self, is_all: bool) -> Result<String> {
        Ok(self.cluster_ip_addresses(is_all)?.join(","))
    }

    /// Add a node in the lowest free slot without starting it.
    pub fn add_node(&mut self, data_center: Option<&str>) -> Result<u32> {
        self.require_active()?;
        let slot = self
            .slots
            .next_free()
            .ok_or(BridgeError::Capacity { limit: NODE_LIMIT })?;

        let is_dse = self.is_dse_cluster();
        tracing::info!(node = %node_name(slot), data_center = ?data_center, "adding node");
        self.execute_ccm_command(self.commands.add_node(slot, data_center, is_dse))?;
        self.slots.set(slot, SlotState::Added);
        Ok(slot)
    }

    /// Add a node and start it. Fails if the node never comes up.
    pub fn bootstrap_node<S: AsRef<str>>(
        &mut self,
        jvm_arguments: &[S],
        data_center: Option<&str>,
    ) -> Result<u32> {
        let slot = self.add_node(data_center)?;
        if !self.start_node(slot, jvm_arguments)? {
            return Err(BridgeError::NodeNotReady { node: slot });
        }
        Ok(slot)
    }

    pub fn start_node<S: AsRef<str>>(&mut self, slot: u32, jvm_arguments: &[S]) -> Result<bool> {
        self.validate_slot(slot)?;
        self.execute_ccm_command(self.commands.start_node(slot, jvm_arguments))?;

        let up = self.is_node_up(slot)?;
        if up {
            self.slots.set(slot, SlotState::Started);
        }
        Ok(up)
    }

    pub fn stop_node(&mut self, slot: u32, is_kill: bool) -> Result<bool> {
        self.validate_slot(slot)?;
        self.execute_ccm_command(self.commands.stop_node(slot, is_kill))?;

        let down = self.is_node_down(slot)?;
        if down {
            self.slots.set(slot, SlotState::Stopped);
        }
        Ok(down)
    }

    pub fn kill_node(&mut self, slot: u32) -> Result<bool> {
        self.stop_node(slot, true)
    }

    /// Freeze the node's process. ccm status keeps reporting it as up.
    pub fn pause_node(&mut self, slot: u32) -> Result<()> {
        self.node_action(slot, NodeAction::Pause)
    }

    pub fn resume_node(&mut self, slot: u32) -> Result<()> {
        self.node_action(slot, NodeAction::Resume)
    }

    /// Decommission the node. Checked once, without polling.
    pub fn decommission_node(&mut self, slot: u32) -> Result<bool> {
        self.node_action(slot, NodeAction::Decommission)?;
        let decommissioned = self.is_node_decommissioned(slot)?;
        if decommissioned {
            self.slots.set(slot, SlotState::Decommissioned);
        }
        Ok(decommissioned)
    }

    /// Remove the node from the cluster definition and free its slot.
    pub fn remove_node(&mut self, slot: u32) -> Result<()> {
        self.node_action(slot, NodeAction::Remove)?;
        self.slots.release(slot);
        Ok(())
    }

    fn node_action(&mut self, slot: u32, action: NodeAction) -> Result<()> {
        self.validate_slot(slot)?;
        tracing::info!(node = %node_name(slot), ?action, "node action");
        self.execute_ccm_command(self.commands.node_action(slot, action))?;
        Ok(())
    }

    pub fn enable_node_binary_protocol(&mut self, slot: u32) -> Result<()> {
        self.toggle_node_feature(slot, NodeFeature::BinaryProtocol, true)
    }

    pub fn disable_node_binary_protocol(&mut self, slot: u32) -> Result<()> {
        self.toggle_node_feature(slot, NodeFeature::BinaryProtocol, false)
    }

    pub fn enable_node_gossip(&mut self, slot: u32) -> Result<()> {
        self.toggle_node_feature(slot, NodeFeature::Gossip, true)
    }

    pub fn disable_node_gossip(&mut self, slot: u32) -> Result<()> {
        self.toggle_node_feature(slot, NodeFeature::Gossip, false)
    }

    fn toggle_node_feature(&mut self, slot: u32, feature: NodeFeature, enable: bool) -> Result<()> {
        self.validate_slot(slot)?;
        self.execute_ccm_command(self.commands.toggle_node_feature(slot, feature, enable))?;
        Ok(())
    }

    /// Run a CQL statement through the node's cqlsh and return its output.
    pub fn execute_cql_on_node(&mut self, slot: u32, cql: &str) -> Result<String> {
        self.validate_slot(slot)?;
        self.execute_ccm_query(self.commands.execute_cql(slot, cql))
    }

    /// Poll until the node's address is listed as up.
    pub fn is_node_up(&mut self, slot: u32) -> Result<bool> {
        self.validate_slot(slot)?;
        let address = self.node_address(slot);
        let policy = self.poll_policy();
        poll_until(&policy, "node up", || -> Result<bool> {
            Ok(self.cluster_status()?.nodes_up.contains(&address))
        })
    }

    /// Poll until the node's address is no longer listed as up.
    pub fn is_node_down(&mut self, slot: u32) -> Result<bool> {
        self.validate_slot(slot)?;
        let address = self.node_address(slot);
        let policy = self.poll_policy();
        poll_until(&policy, "node down", || -> Result<bool> {
            Ok(!self.cluster_status()?.nodes_up.contains(&address))
        })
    }

    pub fn is_node_decommissioned(&mut self, slot: u32) -> Result<bool> {
        self.validate_slot(slot)?;
        let name = node_name(slot);
        let status = self.cluster_status()?;
        Ok(status
            .node(&name)
            .is_some_and(|n| n.state == NodeState::Decommissioned))
    }

    /// Ask a live node which Cassandra release it runs.
    pub fn get_cassandra_version(&mut self) -> Result<CassVersion> {
        let slot = self.query_slot()?;
        let output = self.execute_ccm_query(self.commands.cassandra_version(slot))?;
        let version = reply::parse_release_version(&output)
            .map_err(|source| BridgeError::Version { output, source })?;
        self.state.cassandra_version = version.clone();
        Ok(version)
    }

    /// Ask a live node which DSE release it runs.
    pub fn get_dse_version(&mut self) -> Result<DseVersion> {
        let slot = self.query_slot()?;
        let output = self.execute_ccm_query(self.commands.dse_version(slot))?;
        let version = reply::parse_dse_version(&output)
            .map_err(|source| BridgeError::Version { output, source })?;
        self.state.dse_version = version.clone();
        Ok(version)
    }

    /// Release the transport. Safe to call more than once.
    pub fn finalize(&mut self) {
        self.transport.finalize();
    }

    fn require_active(&self) -> Result<&ActiveCluster> {
        self.state.cluster.as_ref().ok_or(BridgeError::NoActiveCluster)
    }

    fn set_phase(&mut self, phase: ClusterPhase) {
        if let Some(active) = self.state.cluster.as_mut() {
            active.phase = phase;
        }
    }

    fn validate_slot(&self, slot: u32) -> Result<()> {
        if !NodeSlots::contains(slot) {
            return Err(BridgeError::InvalidNode {
                node: slot,
                limit: NODE_LIMIT,
            });
        }
        self.require_active()?;
        if !self.slots.state(slot).is_occupied() {
            tracing::warn!(node = %node_name(slot), "node slot is not in use by this bridge");
        }
        Ok(())
    }

    /// The node version queries go to: the first member that was not
    /// decommissioned, else node1.
    fn query_slot(&self) -> Result<u32> {
        self.require_active()?;
        Ok(self
            .slots
            .occupied()
            .find(|slot| self.slots.state(*slot) != SlotState::Decommissioned)
            .unwrap_or(1))
    }

    fn node_address(&self, slot: u32) -> String {
        format!("{}{slot}", self.config.ip_prefix())
    }

    fn is_dse_cluster(&self) -> bool {
        self.state
            .cluster
            .as_ref()
            .and_then(|c| c.topology.as_ref())
            .map_or(self.config.use_dse, |t| t.engine.is_dse())
    }

    fn poll_policy(&self) -> PollPolicy {
        self.config.poll.clone()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.finalize();
    }
}

fn transport_for(config: &BridgeConfig) -> Result<Box<dyn CommandTransport>> {
    match &config.deployment {
        Deployment::Local => Ok(Box::new(LocalTransport::new())),
        #[cfg(feature = "remote")]
        Deployment::Remote(remote) => {
            use crate::ssh::SessionSettings;
            use crate::transport::RemoteTransport;

            Ok(Box::new(RemoteTransport::new(SessionSettings {
                host: config.host.clone(),
                port: remote.port,
                username: remote.username.clone(),
                authentication: remote.authentication.clone(),
            })))
        }
        #[cfg(not(feature = "remote"))]
        Deployment::Remote(_) => Err(crate::error::ConfigError::RemoteUnsupported.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::CommandOutput;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies in order and records what was asked.
    #[derive(Clone, Default)]
    struct Scripted {
        replies: Arc<Mutex<VecDeque<CommandOutput>>>,
        seen: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl Scripted {
        fn reply(self, output: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(CommandOutput::new(output, Some(0)));
            self
        }

        fn fail(self, output: &str, code: i32) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(CommandOutput::new(output, Some(code)));
            self
        }

        fn seen(&self) -> Vec<Vec<String>> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl CommandTransport for Scripted {
        fn execute(
            &mut self,
            argv: &[String],
        ) -> std::result::Result<CommandOutput, TransportError> {
            self.seen.lock().unwrap().push(argv.to_vec());
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    fn config() -> BridgeConfig {
        BridgeConfig {
            poll: PollPolicy::new(2, std::time::Duration::ZERO),
            ..Default::default()
        }
    }

    #[test]
    fn test_operations_need_an_active_cluster() {
        let script = Scripted::default();
        let mut bridge = Bridge::with_transport(config(), script.clone()).unwrap();

        assert!(matches!(bridge.cluster_status(), Err(BridgeError::NoActiveCluster)));
        assert!(matches!(bridge.add_node(None), Err(BridgeError::NoActiveCluster)));
        assert!(matches!(bridge.start_cluster::<&str>(&[]), Err(BridgeError::NoActiveCluster)));
        assert!(script.seen().is_empty());
    }

    #[test]
    fn test_slot_is_validated_before_anything_runs() {
        let script = Scripted::default();
        let mut bridge = Bridge::with_transport(config(), script.clone()).unwrap();

        assert!(matches!(
            bridge.stop_node(0, false),
            Err(BridgeError::InvalidNode { node: 0, limit: NODE_LIMIT })
        ));
        assert!(matches!(
            bridge.pause_node(NODE_LIMIT + 1),
            Err(BridgeError::InvalidNode { .. })
        ));
        assert!(script.seen().is_empty());
    }

    #[test]
    fn test_create_runs_create_then_updateconf() {
        let script = Scripted::default().reply("").reply("").reply("");
        let mut bridge = Bridge::with_transport(config(), script.clone()).unwrap();

        let topology = bridge.topology(2, 1);
        assert!(bridge.create_cluster(&topology).unwrap());
        assert_eq!(bridge.active_cluster(), Some("cpp-driver_2_1_nodes"));
        assert_eq!(bridge.slots().occupied_count(), 3);
        assert_eq!(
            bridge.state().cluster.as_ref().map(|c| c.phase),
            Some(ClusterPhase::Configured)
        );

        let seen = script.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0][1], "list");
        assert_eq!(seen[1][1], "create");
        assert_eq!(seen[2][1], "updateconf");
    }

    #[test]
    fn test_failure_reply_becomes_an_error() {
        let script = Scripted::default().fail("Usage: ccm <cmd>", 2);
        let mut bridge = Bridge::with_transport(config(), script).unwrap();

        let err = bridge.available_clusters().unwrap_err();
        assert!(matches!(err, BridgeError::ToolReportedFailure { .. }));
    }

    #[test]
    fn test_switch_to_unknown_cluster_is_false() {
        let script = Scripted::default().reply(" cpp-driver_1_0_nodes\n");
        let mut bridge = Bridge::with_transport(config(), script.clone()).unwrap();

        assert!(!bridge.switch_cluster("other").unwrap());
        assert_eq!(bridge.active_cluster(), None);
        assert_eq!(script.seen().len(), 1);
    }

    #[test]
    fn test_switch_adopts_slots_from_status() {
        let script = Scripted::default()
            .reply(" cpp-driver_2_0_nodes\n*other\n")
            .reply("")
            .reply(
                "Cluster: 'cpp-driver_2_0_nodes'\n\
                 ----------------------------\n\
                 node1: UP (127.0.0.1)\n\
                 node2: DECOMMISSIONED\n\
                 node3: DOWN (127.0.0.3)\n",
            );
        let mut bridge = Bridge::with_transport(config(), script.clone()).unwrap();

        assert!(bridge.switch_cluster("cpp-driver_2_0_nodes").unwrap());
        assert_eq!(bridge.slots().state(1), SlotState::Started);
        assert_eq!(bridge.slots().state(2), SlotState::Decommissioned);
        assert_eq!(bridge.slots().state(3), SlotState::Stopped);
        assert_eq!(bridge.slots().next_free(), Some(4));
        assert_eq!(
            bridge.state().cluster.as_ref().map(|c| c.phase),
            Some(ClusterPhase::Started)
        );
        assert_eq!(script.seen()[1][1], "switch");
    }

    #[test]
    fn test_cluster_up_gives_up_after_policy() {
        let stuck = "node1: DOWN (127.0.0.1)\n";
        let script = Scripted::default()
            .reply("*cpp-driver_1_0_nodes\n")
            .reply(stuck)
            .reply(stuck)
            .reply(stuck);
        let mut bridge = Bridge::with_transport(config(), script.clone()).unwrap();
        bridge.resume_active_cluster().unwrap();

        assert!(!bridge.is_cluster_up().unwrap());
        // list, adopt status, then one status per attempt
        assert_eq!(script.seen().len(), 4);
    }

    #[test]
    fn test_version_reply_must_parse() {
        let script = Scripted::default()
            .reply("*cpp-driver_1_0_nodes\n")
            .reply("node1: UP (127.0.0.1)\n")
            .reply("ReleaseVersion: 3.11.4\n")
            .reply("nonsense\n");
        let mut bridge = Bridge::with_transport(config(), script).unwrap();
        bridge.resume_active_cluster().unwrap();

        assert_eq!(bridge.get_cassandra_version().unwrap(), CassVersion::new(3, 11, 4));
        assert!(matches!(
            bridge.get_cassandra_version(),
            Err(BridgeError::Version { .. })
        ));
    }
}
