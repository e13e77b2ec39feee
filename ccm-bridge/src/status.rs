//! Parsing of the `ccm status` listing.
//!
//! Node lines look like `node1: UP (127.0.0.1)`, `node2: DECOMMISSIONED` or
//! `node3: DOWN (Not initialized)`. Anything that does not have that shape
//! (the `Cluster: 'name'` header, separator rules, blank lines) is skipped.
//! State tokens ccm may add in the future are classified as uninitialized.

use std::collections::BTreeSet;
use std::net::IpAddr;

/// Classified state of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Up,
    Down,
    Uninitialized,
    Decommissioned,
}

impl NodeState {
    fn classify(token: &str, detail: Option<&str>) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "up" => NodeState::Up,
            "down"
                if detail.is_some_and(|d| d.trim().eq_ignore_ascii_case("not initialized")) =>
            {
                NodeState::Uninitialized
            }
            "down" => NodeState::Down,
            "decommissioned" => NodeState::Decommissioned,
            "uninitialized" => NodeState::Uninitialized,
            other => {
                tracing::warn!(state = other, "unknown node state, treating as uninitialized");
                NodeState::Uninitialized
            }
        }
    }
}

/// One classified status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub name: String,
    pub state: NodeState,
    pub address: Option<IpAddr>,
}

impl NodeEntry {
    /// The address, or the node name when ccm did not report one.
    pub fn key(&self) -> String {
        match self.address {
            Some(address) => address.to_string(),
            None => self.name.clone(),
        }
    }
}

/// Snapshot of the active cluster. Built fresh for every query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterStatus {
    pub nodes_up: BTreeSet<String>,
    pub nodes_down: BTreeSet<String>,
    pub nodes_uninitialized: BTreeSet<String>,
    pub nodes_decommissioned: BTreeSet<String>,
    pub node_count: u32,
    /// Entries in the order ccm listed them.
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "status listing lost data: {classified} node lines classified but only {retained} {what} retained"
)]
pub struct StatusParseError {
    pub classified: u32,
    pub retained: usize,
    pub what: &'static str,
}

impl ClusterStatus {
    /// Parse a `ccm status` reply.
    ///
    /// Fails only when classified lines collapse into fewer set entries
    /// (duplicate node names or addresses), which would otherwise hide nodes
    /// from readiness checks.
    pub fn parse(text: &str) -> Result<Self, StatusParseError> {
        let mut status = ClusterStatus::default();

        for line in text.lines() {
            let Some(entry) = parse_line(line) else {
                if !line.trim().is_empty() {
                    tracing::trace!(line, "skipping status line");
                }
                continue;
            };

            let key = entry.key();
            match entry.state {
                NodeState::Up => status.nodes_up.insert(key),
                NodeState::Down => status.nodes_down.insert(key),
                NodeState::Uninitialized => status.nodes_uninitialized.insert(key),
                NodeState::Decommissioned => status.nodes_decommissioned.insert(key),
            };
            status.nodes.push(entry);
            status.node_count += 1;
        }

        status.check()?;
        Ok(status)
    }

    fn check(&self) -> Result<(), StatusParseError> {
        let in_sets = self.nodes_up.len()
            + self.nodes_down.len()
            + self.nodes_uninitialized.len()
            + self.nodes_decommissioned.len();
        if in_sets != self.node_count as usize {
            return Err(StatusParseError {
                classified: self.node_count,
                retained: in_sets,
                what: "addresses",
            });
        }

        let names: BTreeSet<&str> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        if names.len() != self.node_count as usize {
            return Err(StatusParseError {
                classified: self.node_count,
                retained: names.len(),
                what: "node names",
            });
        }

        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&NodeEntry> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes that are still cluster members.
    pub fn active_node_count(&self) -> u32 {
        self.node_count - self.nodes_decommissioned.len() as u32
    }

    pub fn all_up(&self) -> bool {
        let active = self.active_node_count();
        active > 0 && self.nodes_up.len() as u32 == active
    }

    pub fn all_down(&self) -> bool {
        self.nodes_up.is_empty()
    }

    /// Addresses of non-decommissioned nodes (`is_all`) or of up nodes, in listing order.
    pub fn ip_addresses(&self, is_all: bool) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| match n.state {
                NodeState::Up => true,
                NodeState::Down | NodeState::Uninitialized => is_all,
                NodeState::Decommissioned => false,
            })
            .filter_map(|n| n.address.map(|a| a.to_string()))
            .collect()
    }
}

fn parse_line(line: &str) -> Option<NodeEntry> {
    let (name, rest) = line.split_once(':')?;
    let name = name.trim();
    let mut name_chars = name.chars();
    if !name_chars.next()?.is_ascii_alphabetic()
        || !name_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return None;
    }

    let rest = rest.trim();
    let (token, detail) = match rest.split_once('(') {
        Some((token, detail)) => (token.trim(), Some(detail.strip_suffix(')')?)),
        None => (rest, None),
    };
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        return None;
    }

    let state = NodeState::classify(token, detail);
    let address = detail.and_then(|d| d.trim().parse::<IpAddr>().ok());

    Some(NodeEntry {
        name: name.to_string(),
        state,
        address,
    })
}
