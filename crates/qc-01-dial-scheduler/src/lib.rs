//! # Outbound Dial Scheduler
//!
//! **Subsystem ID:** 1
//!
//! Decides which remote nodes to open outbound connections to, and runs those
//! connection attempts. Candidates come from configured static nodes,
//! bootnodes, the discovery table's random sample and lookup results.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Pure planning logic (`DialScheduler`, dial history,
//!   admissibility checks, resolve backoff)
//! - **Ports Layer:** Discovery table, dialer, session handler and clock traits
//! - **Service Layer:** `TaskRuntime` and the tokio `DialLoop`
//! - **Adapters Layer:** TCP dialer, system clock, TOML config loading
//!
//! ## Example
//!
//! ```rust
//! use std::time::Instant;
//! use qc_01_dial_scheduler::{ConnectedPeers, DialScheduler, Node, SchedulerConfig};
//!
//! let node: Node = "0101010101010101010101010101010101010101010101010101010101010101@10.0.0.1:30303"
//!     .parse()
//!     .unwrap();
//! let mut scheduler =
//!     DialScheduler::new(vec![node], vec![], None, None, SchedulerConfig::default());
//!
//! // Static nodes are dialed on the first planning pass.
//! let tasks = scheduler.plan(0, &ConnectedPeers::new(), Instant::now());
//! assert_eq!(tasks.len(), 1);
//! assert!(tasks[0].is_dial());
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Deterministic port fakes.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use adapters::{SystemClock, TcpDialer, TomlConfigProvider};
pub use domain::{
    ConfigError, ConnFlags, ConnectedPeers, DialCheckError, DialConfig, DialError, DialHistory,
    DialLoopError, DialOutcome, DialScheduler, DialStats, DialTask, DialTaskError, DiscoveryTask,
    Netlist, Node, NodeId, ResolveBackoff, SchedulerConfig, SetupError, Task, WaitTask,
};
pub use ports::{Clock, Connection, ConnectionHandler, DialControl, DiscoveryTable, NodeDialer};
pub use service::{DialLoop, DialLoopHandle, TaskRuntime};
