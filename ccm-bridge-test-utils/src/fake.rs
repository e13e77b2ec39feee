//! An in-memory stand-in for the ccm tool

use crate::fixtures;
use ccm_bridge::topology::slot_from_node_name;
use ccm_bridge::{CommandOutput, CommandTransport, NodeState, TransportError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const USAGE: &str = "Usage: ccm <cluster_cmd> [options]";
const DEFAULT_IP_PREFIX: &str = "127.0.0.";

/// A node as the fake tool tracks it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeNode {
    pub state: NodeState,
    pub paused: bool,
    pub data_center: Option<String>,
    /// `nodetool` subcommands run against this node, in order.
    pub nodetool: Vec<String>,
}

impl FakeNode {
    fn new(data_center: Option<String>) -> Self {
        Self {
            state: NodeState::Uninitialized,
            paused: false,
            data_center,
            nodetool: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct FakeCluster {
    version: String,
    is_dse: bool,
    ip_prefix: String,
    nodes: BTreeMap<u32, FakeNode>,
    config_updates: Vec<Vec<String>>,
    cql: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    clusters: BTreeMap<String, FakeCluster>,
    active: Option<String>,
    history: Vec<Vec<String>>,
    failures: Vec<(String, String)>,
    cql_reply: Option<String>,
    frozen: bool,
    hide_exit_codes: bool,
}

/// Simulates ccm well enough to drive a [`ccm_bridge::Bridge`] end to end.
///
/// Clones share state: hand one clone to the bridge and keep another to
/// inspect what the bridge did.
///
/// ```
/// use ccm_bridge_test_utils::FakeCcm;
///
/// let ccm = FakeCcm::new().with_cluster("cpp-driver_1_0_nodes", 1);
/// assert_eq!(ccm.active_cluster().as_deref(), Some("cpp-driver_1_0_nodes"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FakeCcm {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCcm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-existing cluster with `nodes` uninitialized nodes; it becomes the
    /// current one.
    pub fn with_cluster(self, name: &str, nodes: u32) -> Self {
        {
            let mut state = self.lock();
            state.clusters.insert(
                name.to_string(),
                FakeCluster::new("3.4", false, DEFAULT_IP_PREFIX, nodes),
            );
            state.active = Some(name.to_string());
        }
        self
    }

    /// While frozen, start and stop commands leave node states alone, like a
    /// tool whose nodes never finish booting or shutting down.
    pub fn freeze(&self, frozen: bool) {
        self.lock().frozen = frozen;
    }

    /// Make the next command whose first argument is `subcommand` fail with
    /// `output`. Node commands match on their action, e.g. `decommission`.
    pub fn fail_next(&self, subcommand: &str, output: &str) {
        self.lock()
            .failures
            .push((subcommand.to_string(), output.to_string()));
    }

    /// Answer every cqlsh statement with `output` instead of an empty result.
    pub fn reply_to_cql(&self, output: &str) {
        self.lock().cql_reply = Some(output.to_string());
    }

    /// Report no exit codes, like a transport that cannot observe them.
    pub fn without_exit_codes(self) -> Self {
        self.lock().hide_exit_codes = true;
        self
    }

    /// Every argv received, program name included.
    pub fn history(&self) -> Vec<Vec<String>> {
        self.lock().history.clone()
    }

    /// Every command received, without the program name, joined by spaces.
    pub fn commands(&self) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .map(|argv| argv[1..].join(" "))
            .collect()
    }

    pub fn clusters(&self) -> Vec<String> {
        self.lock().clusters.keys().cloned().collect()
    }

    pub fn active_cluster(&self) -> Option<String> {
        self.lock().active.clone()
    }

    /// Node `slot` of the current cluster.
    pub fn node(&self, slot: u32) -> Option<FakeNode> {
        let state = self.lock();
        let name = state.active.as_ref()?;
        state.clusters.get(name)?.nodes.get(&slot).cloned()
    }

    pub fn node_state(&self, slot: u32) -> Option<NodeState> {
        self.node(slot).map(|n| n.state)
    }

    /// Arguments of every `updateconf`/`updatedseconf` on the current cluster.
    pub fn config_updates(&self) -> Vec<Vec<String>> {
        self.with_active(|c| c.config_updates.clone())
    }

    pub fn cql_statements(&self) -> Vec<String> {
        self.with_active(|c| c.cql.clone())
    }

    /// Engine version the current cluster was created with.
    pub fn version(&self) -> Option<String> {
        let state = self.lock();
        let name = state.active.as_ref()?;
        state.clusters.get(name).map(|c| c.version.clone())
    }

    fn with_active<T: Default>(&self, f: impl FnOnce(&FakeCluster) -> T) -> T {
        let state = self.lock();
        state
            .active
            .as_ref()
            .and_then(|name| state.clusters.get(name))
            .map(f)
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommandTransport for FakeCcm {
    fn execute(&mut self, argv: &[String]) -> Result<CommandOutput, TransportError> {
        let Some((_program, args)) = argv.split_first() else {
            return Err(TransportError::EmptyCommand);
        };
        tracing::debug!(argv = ?argv, "fake ccm");

        let mut state = self.lock();
        state.history.push(argv.to_vec());

        let reply = match state.take_failure(args) {
            Some(output) => Err(output),
            None => state.dispatch(args),
        };
        let (output, code) = match reply {
            Ok(output) => (output, 0),
            Err(output) => (output, 1),
        };
        let exit_code = (!state.hide_exit_codes).then_some(code);
        Ok(CommandOutput::new(output, exit_code))
    }
}

impl FakeCluster {
    fn new(version: &str, is_dse: bool, ip_prefix: &str, nodes: u32) -> Self {
        Self {
            version: version.to_string(),
            is_dse,
            ip_prefix: ip_prefix.to_string(),
            nodes: (1..=nodes).map(|slot| (slot, FakeNode::new(None))).collect(),
            config_updates: Vec::new(),
            cql: Vec::new(),
        }
    }

    fn members(&mut self) -> impl Iterator<Item = &mut FakeNode> {
        self.nodes
            .values_mut()
            .filter(|n| n.state != NodeState::Decommissioned)
    }
}

impl FakeState {
    fn take_failure(&mut self, args: &[String]) -> Option<String> {
        let word = match args.first() {
            Some(first) if slot_from_node_name(first).is_some() => args.get(1),
            first => first,
        }?;
        let index = self.failures.iter().position(|(w, _)| w == word)?;
        Some(self.failures.remove(index).1)
    }

    fn dispatch(&mut self, args: &[String]) -> Result<String, String> {
        let Some(first) = args.first() else {
            return Err(USAGE.to_string());
        };
        let rest = &args[1..];
        let frozen = self.frozen;

        match first.as_str() {
            "list" => Ok(fixtures::list_reply(
                self.clusters.keys().map(String::as_str),
                self.active.as_deref(),
            )),
            "create" => self.create(rest),
            "updateconf" | "updatedseconf" => {
                self.current()?.config_updates.push(args.to_vec());
                Ok(String::new())
            }
            "start" => {
                for node in self.current()?.members().filter(|_| !frozen) {
                    node.state = NodeState::Up;
                }
                Ok(String::new())
            }
            "stop" => {
                for node in self.current()?.members().filter(|_| !frozen) {
                    if node.state == NodeState::Up {
                        node.state = NodeState::Down;
                    }
                }
                Ok(String::new())
            }
            "clear" => {
                for node in self.current()?.members() {
                    node.state = NodeState::Uninitialized;
                }
                Ok(String::new())
            }
            "status" => {
                let name = self.active.clone().unwrap_or_default();
                let cluster = self.current()?;
                Ok(fixtures::status_reply(
                    &name,
                    cluster.nodes.iter().map(|(slot, n)| (*slot, n.state)),
                    &cluster.ip_prefix,
                ))
            }
            "switch" => {
                let name = rest.first().ok_or(USAGE)?;
                if !self.clusters.contains_key(name) {
                    return Err(format!(
                        "{name} does not appear to be a valid cluster (use ccm list to view valid clusters)"
                    ));
                }
                self.active = Some(name.clone());
                Ok(String::new())
            }
            "remove" => {
                let name = match rest.first() {
                    Some(name) => name.clone(),
                    None => self.active.clone().ok_or_else(no_current_cluster)?,
                };
                if self.clusters.remove(&name).is_none() {
                    return Err(format!("Cluster {name} does not exist"));
                }
                if self.active.as_ref() == Some(&name) {
                    self.active = None;
                }
                Ok(String::new())
            }
            "add" => self.add(rest),
            node => match slot_from_node_name(node) {
                Some(slot) => self.node_command(slot, rest),
                None => Err(USAGE.to_string()),
            },
        }
    }

    fn current(&mut self) -> Result<&mut FakeCluster, String> {
        let name = self.active.as_ref().ok_or_else(no_current_cluster)?;
        self.clusters.get_mut(name).ok_or_else(no_current_cluster)
    }

    fn create(&mut self, args: &[String]) -> Result<String, String> {
        let name = args.first().ok_or(USAGE)?;
        if self.clusters.contains_key(name) {
            return Err(format!("Cannot create existing cluster {name}"));
        }

        let version = option_value(args, "-v").ok_or(USAGE)?;
        let version = version
            .strip_prefix("git:cassandra-")
            .or_else(|| version.strip_prefix("git:"))
            .unwrap_or(version);
        let nodes = option_value(args, "-n")
            .ok_or(USAGE)?
            .split(':')
            .map(|n| n.parse::<u32>().map_err(|_| USAGE.to_string()))
            .sum::<Result<u32, String>>()?;
        let ip_prefix = option_value(args, "-i").unwrap_or(DEFAULT_IP_PREFIX);
        let is_dse = args.iter().any(|a| a == "--dse");

        self.clusters.insert(
            name.clone(),
            FakeCluster::new(version, is_dse, ip_prefix, nodes),
        );
        self.active = Some(name.clone());
        Ok(format!("Current cluster is now: {name}\n"))
    }

    fn add(&mut self, args: &[String]) -> Result<String, String> {
        let node = args.first().ok_or(USAGE)?;
        let slot = slot_from_node_name(node).ok_or(USAGE)?;
        let data_center = option_value(args, "-d").map(str::to_string);

        let cluster = self.current()?;
        if cluster.nodes.contains_key(&slot) {
            return Err(format!("Cannot create existing node {node}"));
        }
        cluster.nodes.insert(slot, FakeNode::new(data_center));
        Ok(String::new())
    }

    fn node_command(&mut self, slot: u32, args: &[String]) -> Result<String, String> {
        let frozen = self.frozen;
        let cql_reply = self.cql_reply.clone();
        let cluster = self.current()?;
        let action = args.first().map(String::as_str).unwrap_or_default();

        if action == "remove" {
            return match cluster.nodes.remove(&slot) {
                Some(_) => Ok(String::new()),
                None => Err(format!("node{slot} does not exist")),
            };
        }

        let version = cluster.version.clone();
        let is_dse = cluster.is_dse;
        let Some(node) = cluster.nodes.get_mut(&slot) else {
            return Err(format!("node{slot} does not exist"));
        };

        match action {
            "start" => {
                if !frozen {
                    node.state = NodeState::Up;
                }
            }
            "stop" => {
                if !frozen && node.state == NodeState::Up {
                    node.state = NodeState::Down;
                }
            }
            "pause" => node.paused = true,
            "resume" => node.paused = false,
            "decommission" => node.state = NodeState::Decommissioned,
            "nodetool" => node.nodetool.push(args.get(1).cloned().ok_or(USAGE)?),
            "cqlsh" => {
                let cql = option_value(args, "-x").ok_or(USAGE)?.to_string();
                cluster.cql.push(cql);
                return Ok(cql_reply.unwrap_or_else(|| "\n(0 rows)\n".to_string()));
            }
            "version" => return Ok(format!("ReleaseVersion: {version}\n")),
            "dse" if is_dse => return Ok(format!("{version}\n")),
            _ => return Err(USAGE.to_string()),
        }
        Ok(String::new())
    }
}

fn no_current_cluster() -> String {
    "Error: no current cluster, use ccm switch or ccm create".to_string()
}

fn option_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let index = args.iter().position(|a| a == flag)?;
    args.get(index + 1).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ccm: &mut FakeCcm, args: &[&str]) -> CommandOutput {
        let argv: Vec<String> = std::iter::once("ccm")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect();
        ccm.execute(&argv).unwrap()
    }

    #[test]
    fn test_create_and_start() {
        let mut ccm = FakeCcm::new();
        let output = run(
            &mut ccm,
            &["create", "c", "-v", "git:cassandra-3.11.4", "-n", "2:1", "-i", "10.0.0.", "-b"],
        );
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(ccm.version().as_deref(), Some("3.11.4"));

        run(&mut ccm, &["start"]);
        let status = run(&mut ccm, &["status"]);
        assert!(status.contains("node3: UP (10.0.0.3)"));
    }

    #[test]
    fn test_failures() {
        let mut ccm = FakeCcm::new().without_exit_codes();
        let output = run(&mut ccm, &["status"]);
        assert_eq!(output.exit_code, None);
        assert!(output.contains("Error"));

        let mut ccm = FakeCcm::new().with_cluster("c", 1);
        ccm.fail_next("decommission", "Error: nodetool failed");
        assert_eq!(run(&mut ccm, &["node1", "decommission"]).exit_code, Some(1));
        assert_eq!(run(&mut ccm, &["node1", "decommission"]).exit_code, Some(0));
        assert_eq!(ccm.node_state(1), Some(NodeState::Decommissioned));
    }

    #[test]
    fn test_frozen_nodes_do_not_move() {
        let mut ccm = FakeCcm::new().with_cluster("c", 2);
        ccm.freeze(true);
        run(&mut ccm, &["start"]);
        assert_eq!(ccm.node_state(1), Some(NodeState::Uninitialized));
    }
}
