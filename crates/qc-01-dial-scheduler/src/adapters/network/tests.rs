//! Tests for Network Adapters

use super::*;
use crate::domain::{ConfigError, DialConfig, DialError, Node, NodeId};
use crate::ports::{Clock, NodeDialer};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const NODE_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

// ============================================================================
// SystemClock
// ============================================================================

#[test]
fn test_system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let t1 = clock.now();
    let t2 = clock.now();
    assert!(t2 >= t1);
}

#[tokio::test(start_paused = true)]
async fn test_system_clock_follows_paused_runtime() {
    let clock = SystemClock::new();
    let before = clock.now();

    tokio::time::advance(Duration::from_secs(30)).await;

    assert!(clock.now().duration_since(before) >= Duration::from_secs(30));
}

// ============================================================================
// TcpDialer
// ============================================================================

#[tokio::test]
async fn test_tcp_dialer_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        socket.read_exact(&mut buf).await.unwrap();
        buf
    });

    let dialer = TcpDialer::new(Duration::from_secs(5));
    let mut conn = dialer
        .dial(&Node::new(NodeId::new([1; 32]), addr))
        .await
        .unwrap();
    conn.write_all(b"ping").await.unwrap();

    assert_eq!(&accept.await.unwrap(), b"ping");
}

#[tokio::test]
async fn test_tcp_dialer_reports_refused_connection() {
    // Bind then drop to get a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    let dialer = TcpDialer::new(Duration::from_secs(5));
    let result = dialer.dial(&Node::new(NodeId::new([1; 32]), addr)).await;

    assert!(matches!(result, Err(DialError::Io { .. })));
}

#[tokio::test]
async fn test_tcp_dialer_rejects_incomplete_node() {
    let dialer = TcpDialer::default();
    let result = dialer.dial(&Node::incomplete(NodeId::new([1; 32]))).await;

    assert!(matches!(result, Err(DialError::NoAddress(_))));
    assert_eq!(dialer.timeout(), Duration::from_secs(15));
}

#[test]
fn test_tcp_dialer_uses_configured_timeout() {
    let config = DialConfig {
        dial_timeout_secs: 3,
        ..DialConfig::default()
    };
    assert_eq!(TcpDialer::from_config(&config).timeout(), Duration::from_secs(3));
}

// ============================================================================
// TomlConfigProvider
// ============================================================================

#[test]
fn test_toml_config_provider_parses_dial_table() {
    let content = format!(
        r#"
        [dial]
        max_dynamic_dials = 10
        max_active_dial_tasks = 4
        static_nodes = ["{NODE_HEX}@10.0.0.1:30303"]
        bootnodes = ["{NODE_HEX}@10.0.0.2:30303"]
        netrestrict = "10.0.0.0/8"
        "#
    );

    let provider = TomlConfigProvider::parse(&content).unwrap();
    let config = provider.config();

    assert_eq!(config.max_dynamic_dials, 10);
    assert_eq!(config.max_active_dial_tasks, 4);
    assert_eq!(config.dial_timeout_secs, 15);
    assert_eq!(config.static_nodes().unwrap().len(), 1);
    assert_eq!(
        config.bootnodes().unwrap()[0].addr,
        Some("10.0.0.2:30303".parse().unwrap())
    );
    assert!(config.netrestrict().unwrap().is_some());
}

#[test]
fn test_toml_config_provider_defaults_without_dial_table() {
    let provider = TomlConfigProvider::parse("[other]\nkey = 1\n").unwrap();
    assert_eq!(provider.into_config(), DialConfig::default());
}

#[test]
fn test_toml_config_provider_rejects_bad_syntax() {
    let result = TomlConfigProvider::parse("[dial\nmax_dynamic_dials = ");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_toml_config_provider_rejects_bad_node() {
    let result = TomlConfigProvider::parse("[dial]\nstatic_nodes = [\"zz@1.2.3.4:1\"]\n");
    assert!(matches!(result, Err(ConfigError::Node(_))));
}

#[test]
fn test_toml_config_provider_rejects_bad_cidr() {
    let result = TomlConfigProvider::parse("[dial]\nnetrestrict = \"10.0.0.0/33\"\n");
    assert!(matches!(result, Err(ConfigError::Netlist(_))));
}

#[test]
fn test_toml_config_provider_rejects_invalid_values() {
    let result = TomlConfigProvider::parse("[dial]\nmax_active_dial_tasks = 0\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_toml_config_provider_rejects_oversized_history_window() {
    let result = TomlConfigProvider::parse(
        "[dial]\ndial_history_expiration_secs = 9223372036854775807\n",
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_toml_config_provider_missing_file() {
    let result = TomlConfigProvider::load("/nonexistent/dial.toml");
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
