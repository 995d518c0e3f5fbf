//! # Adapters
//!
//! Concrete implementations of the outbound ports for a running node.

/// TCP dialing, system clock and config file loading
pub mod network;

pub use network::{SystemClock, TcpDialer, TomlConfigProvider};
