use ccm_bridge::slots::SlotState;
use ccm_bridge::{Bridge, BridgeError, NODE_LIMIT, NodeState};
use ccm_bridge_test_utils::{FakeCcm, bridge_for};

fn started(nodes: u32) -> (FakeCcm, Bridge) {
    let ccm = FakeCcm::new();
    let mut bridge = bridge_for(&ccm);
    let topology = bridge.topology(nodes, 0);
    bridge.create_cluster(&topology).unwrap();
    assert!(bridge.start_cluster::<&str>(&[]).unwrap());
    (ccm, bridge)
}

#[test]
fn test_added_nodes_take_the_next_slot() {
    let (ccm, mut bridge) = started(2);

    assert_eq!(bridge.add_node(None).unwrap(), 3);
    assert!(
        ccm.commands()
            .contains(&"add node3 -b -i 127.0.0.3 -j 7300 -r 2300".to_string())
    );
    assert_eq!(ccm.node_state(3), Some(NodeState::Uninitialized));
    assert_eq!(bridge.slots().state(3), SlotState::Added);

    assert_eq!(bridge.add_node(Some("dc2")).unwrap(), 4);
    assert_eq!(ccm.node(4).unwrap().data_center.as_deref(), Some("dc2"));
}

#[test]
fn test_bootstrap_starts_the_node() {
    let (ccm, mut bridge) = started(1);

    let node = bridge.bootstrap_node(&["-Dfoo=bar"], None).unwrap();
    assert_eq!(node, 2);
    assert_eq!(ccm.node_state(2), Some(NodeState::Up));
    assert_eq!(bridge.slots().state(2), SlotState::Started);
    assert_eq!(bridge.cluster_contact_points(false).unwrap(), "127.0.0.1,127.0.0.2");
}

#[test]
fn test_bootstrap_fails_when_node_never_comes_up() {
    let (ccm, mut bridge) = started(1);
    ccm.freeze(true);

    assert!(matches!(
        bridge.bootstrap_node::<&str>(&[], None),
        Err(BridgeError::NodeNotReady { node: 2 })
    ));
    // the node was still added
    assert_eq!(bridge.slots().state(2), SlotState::Added);
}

#[test]
fn test_capacity_error_changes_nothing() {
    let (ccm, mut bridge) = started(NODE_LIMIT);

    let before = ccm.history().len();
    let slots = bridge.slots().clone();
    assert!(matches!(
        bridge.add_node(None),
        Err(BridgeError::Capacity { limit: NODE_LIMIT })
    ));
    assert_eq!(ccm.history().len(), before);
    assert_eq!(bridge.slots(), &slots);
}

#[test]
fn test_removed_slot_is_reused() {
    let (ccm, mut bridge) = started(3);

    bridge.remove_node(2).unwrap();
    assert_eq!(ccm.node(2), None);
    assert_eq!(bridge.slots().state(2), SlotState::Free);
    assert_eq!(bridge.add_node(None).unwrap(), 2);
}

#[test]
fn test_decommissioned_slot_is_not_reused() {
    let (ccm, mut bridge) = started(2);

    assert!(bridge.decommission_node(2).unwrap());
    assert!(bridge.is_node_decommissioned(2).unwrap());
    assert!(!bridge.is_node_decommissioned(1).unwrap());
    assert_eq!(ccm.node_state(2), Some(NodeState::Decommissioned));
    assert!(bridge.is_cluster_up().unwrap());

    assert_eq!(bridge.add_node(None).unwrap(), 3);
    assert_eq!(bridge.cluster_ip_addresses(true).unwrap(), ["127.0.0.1"]);
}

#[test]
fn test_stop_and_start_single_node() {
    let (ccm, mut bridge) = started(2);

    assert!(bridge.stop_node(1, false).unwrap());
    assert_eq!(ccm.node_state(1), Some(NodeState::Down));
    assert_eq!(bridge.slots().state(1), SlotState::Stopped);
    assert!(!bridge.is_cluster_down().unwrap());
    assert_eq!(bridge.cluster_ip_addresses(false).unwrap(), ["127.0.0.2"]);
    assert_eq!(
        bridge.cluster_ip_addresses(true).unwrap(),
        ["127.0.0.1", "127.0.0.2"]
    );

    assert!(bridge.start_node::<&str>(1, &[]).unwrap());
    assert!(bridge.is_node_up(1).unwrap());

    assert!(bridge.kill_node(2).unwrap());
    assert!(ccm.commands().contains(&"node2 stop --not-gently".to_string()));
}

#[test]
fn test_node_up_gives_up() {
    let (ccm, mut bridge) = started(1);
    ccm.freeze(true);

    assert!(!bridge.stop_node(1, false).unwrap());
    assert_eq!(bridge.slots().state(1), SlotState::Started);
}

#[test]
fn test_pause_resume_and_feature_toggles() {
    let (ccm, mut bridge) = started(1);

    bridge.pause_node(1).unwrap();
    assert!(ccm.node(1).unwrap().paused);
    bridge.resume_node(1).unwrap();
    assert!(!ccm.node(1).unwrap().paused);

    bridge.disable_node_binary_protocol(1).unwrap();
    bridge.enable_node_binary_protocol(1).unwrap();
    bridge.disable_node_gossip(1).unwrap();
    bridge.enable_node_gossip(1).unwrap();
    assert_eq!(
        ccm.node(1).unwrap().nodetool,
        ["disablebinary", "enablebinary", "disablegossip", "enablegossip"]
    );
}

#[test]
fn test_cql_is_passed_as_one_argument() {
    let (ccm, mut bridge) = started(1);

    let statement = "CREATE KEYSPACE ks WITH replication = \
                     {'class': 'SimpleStrategy', 'replication_factor': 1};";
    let output = bridge.execute_cql_on_node(1, statement).unwrap();
    assert!(output.contains("(0 rows)"));
    assert_eq!(ccm.cql_statements(), [statement]);
}

#[test]
fn test_cql_rows_are_not_failures() {
    let (ccm, mut bridge) = started(1);

    let rows = "\n message\n-----------------------\n error: disk full\n cannot retry\n \
                keyspace does not exist\n\n(3 rows)\n";
    ccm.reply_to_cql(rows);
    let output = bridge
        .execute_cql_on_node(1, "SELECT message FROM ks.log;")
        .unwrap();
    assert_eq!(output, rows);
}

#[test]
fn test_node_failures_are_reported() {
    let (ccm, mut bridge) = started(1);

    ccm.fail_next("decommission", "error: nodetool failed: connection refused");
    assert!(matches!(
        bridge.decommission_node(1),
        Err(BridgeError::ToolReportedFailure { .. })
    ));
    assert_eq!(bridge.slots().state(1), SlotState::Started);

    assert!(matches!(
        bridge.start_node::<&str>(5, &[]),
        Err(BridgeError::ToolReportedFailure { .. })
    ));
    assert!(matches!(
        bridge.enable_node_gossip(0),
        Err(BridgeError::InvalidNode { node: 0, .. })
    ));
}
