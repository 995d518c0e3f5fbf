//! # Dial Loop Integration Tests
//!
//! Drives a complete `DialLoop` (scheduler, task runtime, command handle)
//! against the in-memory fakes on a paused tokio clock.
//!
//! ## Test Strategy
//!
//! 1. Build the loop from a `DialConfig`, the way a node does
//! 2. Let virtual time run with `tokio::time::sleep`
//! 3. Assert on what the fakes observed and on `DialStats`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use qc_01_dial_scheduler::test_utils::{FakeDialer, FakeDiscoveryTable, RecordingConnectionHandler};
use qc_01_dial_scheduler::{
    ConnFlags, DialConfig, DialControl, DialLoop, DialLoopHandle, DiscoveryTable, Node, NodeId,
    SystemClock,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn id(byte: u8) -> NodeId {
    NodeId::new([byte; 32])
}

fn addr(last: u8) -> SocketAddr {
    format!("10.0.0.{last}:30303").parse().unwrap()
}

fn node(byte: u8) -> Node {
    Node::new(id(byte), addr(byte))
}

struct LocalNode {
    dialer: Arc<FakeDialer>,
    table: Arc<FakeDiscoveryTable>,
    handler: Arc<RecordingConnectionHandler>,
}

impl LocalNode {
    fn new() -> Self {
        init_tracing();
        Self {
            dialer: Arc::new(FakeDialer::new()),
            table: Arc::new(FakeDiscoveryTable::new(id(0xee))),
            handler: Arc::new(RecordingConnectionHandler::new()),
        }
    }

    fn start(&self, config: DialConfig, with_table: bool) -> DialLoopHandle {
        let table: Option<Arc<dyn DiscoveryTable>> = if with_table {
            Some(self.table.clone())
        } else {
            None
        };
        let (dial_loop, handle) = DialLoop::from_config(
            &config,
            self.dialer.clone(),
            table,
            self.handler.clone(),
            Arc::new(SystemClock::new()),
        )
        .expect("valid config");
        self.handler.attach(handle.clone());
        dial_loop.spawn();
        handle
    }
}

/// An unreachable static node is retried once per history expiration.
#[tokio::test(start_paused = true)]
async fn test_unreachable_static_node_is_retried_after_history_expires() {
    let local = LocalNode::new();
    let config = DialConfig {
        static_nodes: vec![node(1).to_string()],
        ..DialConfig::for_testing()
    };
    let handle = local.start(config, false);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(local.dialer.attempt_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(local.dialer.attempt_count(), 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(local.dialer.attempt_count(), 3);
    assert!(local.handler.accepted().is_empty());

    handle.shutdown().await.unwrap();
}

/// A dropped static peer is redialed once its history entry expires.
#[tokio::test(start_paused = true)]
async fn test_dropped_static_peer_is_redialed() {
    let local = LocalNode::new();
    local.dialer.set_reachable(addr(1));
    let config = DialConfig {
        static_nodes: vec![node(1).to_string()],
        ..DialConfig::for_testing()
    };
    let handle = local.start(config, false);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(local.handler.accepted().len(), 1);
    assert_eq!(handle.stats().await.unwrap().peers, 1);

    handle.peer_removed(id(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(40)).await;

    let accepted = local.handler.accepted();
    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted[1], (node(1), ConnFlags::STATIC));
}

/// Lookup results are dialed as dynamic peers, up to the dynamic cap.
#[tokio::test(start_paused = true)]
async fn test_lookup_results_fill_dynamic_slots() {
    let local = LocalNode::new();
    let found: Vec<Node> = (1..=6).map(node).collect();
    for candidate in &found {
        local.dialer.set_reachable(candidate.addr.unwrap());
    }
    local.table.push_lookup_result(found);
    let config = DialConfig {
        max_dynamic_dials: 4,
        ..DialConfig::for_testing()
    };
    let handle = local.start(config, true);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let stats = handle.stats().await.unwrap();

    let accepted = local.handler.accepted();
    assert_eq!(accepted.len(), 4);
    assert!(accepted
        .iter()
        .all(|(_, flags)| *flags == ConnFlags::DYNAMIC));
    assert_eq!(stats.peers, 4);
    assert_eq!(stats.lookup_buffered, 2);
}

/// With no peers at all, bootnodes are dialed after the fallback interval.
#[tokio::test(start_paused = true)]
async fn test_bootnode_fallback() {
    let local = LocalNode::new();
    local.dialer.set_reachable(addr(9));
    let config = DialConfig {
        bootnodes: vec![node(9).to_string()],
        ..DialConfig::for_testing()
    };
    let handle = local.start(config, true);

    tokio::time::sleep(Duration::from_secs(18)).await;
    assert!(local.handler.accepted().is_empty());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(local.handler.accepted(), vec![(node(9), ConnFlags::DYNAMIC)]);

    handle.shutdown().await.unwrap();
}

/// Static nodes added at runtime are dialed; removed ones are not retried.
#[tokio::test(start_paused = true)]
async fn test_runtime_static_node_changes() {
    let local = LocalNode::new();
    let handle = local.start(DialConfig::for_testing(), false);

    handle.add_static(node(5)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(local.dialer.attempt_count(), 1);

    handle.remove_static(id(5)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(local.dialer.attempt_count(), 1);
    assert_eq!(handle.stats().await.unwrap().static_nodes, 0);
}
