//! Canned ccm replies, shaped like the real tool's output

use ccm_bridge::NodeState;

/// One `ccm status` node line
pub fn status_line(slot: u32, state: NodeState, ip_prefix: &str) -> String {
    match state {
        NodeState::Up => format!("node{slot}: UP ({ip_prefix}{slot})"),
        NodeState::Down => format!("node{slot}: DOWN ({ip_prefix}{slot})"),
        NodeState::Uninitialized => format!("node{slot}: DOWN (Not initialized)"),
        NodeState::Decommissioned => format!("node{slot}: DECOMMISSIONED"),
    }
}

/// A full `ccm status` reply, header and rule included
pub fn status_reply<I>(cluster: &str, nodes: I, ip_prefix: &str) -> String
where
    I: IntoIterator<Item = (u32, NodeState)>,
{
    let header = format!("Cluster: '{cluster}'");
    let mut reply = format!("{header}\n{}\n", "-".repeat(header.len()));
    for (slot, state) in nodes {
        reply.push_str(&status_line(slot, state, ip_prefix));
        reply.push('\n');
    }
    reply
}

/// A `ccm list` reply
pub fn list_reply<'a, I>(clusters: I, active: Option<&str>) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    clusters
        .into_iter()
        .map(|name| {
            if Some(name) == active {
                format!(" *{name}\n")
            } else {
                format!("  {name}\n")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccm_bridge::ClusterStatus;

    #[test]
    fn test_status_reply_parses() {
        let reply = status_reply(
            "cpp-driver_3_0_nodes",
            [
                (1, NodeState::Up),
                (2, NodeState::Uninitialized),
                (3, NodeState::Decommissioned),
            ],
            "127.0.0.",
        );
        let status = ClusterStatus::parse(&reply).unwrap();
        assert_eq!(status.node_count, 3);
        assert!(status.nodes_up.contains("127.0.0.1"));
        assert_eq!(status.nodes_decommissioned.len(), 1);
    }
}
