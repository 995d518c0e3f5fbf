//! Test utilities for the dial scheduler.
//!
//! Deterministic in-memory implementations of the outbound ports. Enable with
//! the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use qc_01_dial_scheduler::test_utils::FakeDiscoveryTable;
//! use qc_01_dial_scheduler::{DiscoveryTable, NodeId};
//!
//! let table = FakeDiscoveryTable::new(NodeId::new([0xee; 32]));
//! assert_eq!(table.self_id(), NodeId::new([0xee; 32]));
//! assert!(table.read_random_nodes(8).is_empty());
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ConnFlags, DialError, Node, NodeId, SetupError};
use crate::ports::{Clock, Connection, ConnectionHandler, DialControl, DiscoveryTable, NodeDialer};
use crate::service::DialLoopHandle;

// =============================================================================
// DISCOVERY TABLE
// =============================================================================

/// Discovery table with scripted answers.
///
/// - `read_random_nodes(max)` returns the first `max` configured random nodes
/// - `resolve(id)` answers from the resolvable set
/// - `lookup` pops the next scripted result, or returns nothing
#[derive(Debug)]
pub struct FakeDiscoveryTable {
    self_id: NodeId,
    random: Mutex<Vec<Node>>,
    resolvable: Mutex<HashMap<NodeId, Node>>,
    lookups: Mutex<VecDeque<Vec<Node>>>,
    lookup_delay: Mutex<Duration>,
    resolve_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl FakeDiscoveryTable {
    pub fn new(self_id: NodeId) -> Self {
        Self {
            self_id,
            random: Mutex::new(Vec::new()),
            resolvable: Mutex::new(HashMap::new()),
            lookups: Mutex::new(VecDeque::new()),
            lookup_delay: Mutex::new(Duration::ZERO),
            resolve_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_random_nodes(self, nodes: Vec<Node>) -> Self {
        *self.random.lock() = nodes;
        self
    }

    pub fn set_random_nodes(&self, nodes: Vec<Node>) {
        *self.random.lock() = nodes;
    }

    /// Make `node` resolvable by id.
    pub fn add_resolvable(&self, node: Node) {
        self.resolvable.lock().insert(node.id, node);
    }

    /// Queue the result of the next lookup.
    pub fn push_lookup_result(&self, nodes: Vec<Node>) {
        self.lookups.lock().push_back(nodes);
    }

    /// Make every lookup take `delay` before answering.
    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = delay;
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryTable for FakeDiscoveryTable {
    fn self_id(&self) -> NodeId {
        self.self_id
    }

    async fn resolve(&self, id: NodeId) -> Option<Node> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.resolvable.lock().get(&id).cloned()
    }

    async fn lookup(&self, _target: NodeId) -> Vec<Node> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.lookups.lock().pop_front().unwrap_or_default()
    }

    fn read_random_nodes(&self, max: usize) -> Vec<Node> {
        self.random.lock().iter().take(max).cloned().collect()
    }
}

// =============================================================================
// DIALER
// =============================================================================

/// Dialer that connects only to addresses marked reachable.
///
/// Successful dials return one end of an in-memory duplex pipe.
#[derive(Debug, Default)]
pub struct FakeDialer {
    reachable: Mutex<HashSet<SocketAddr>>,
    delay: Mutex<Duration>,
    attempts: Mutex<Vec<Node>>,
}

impl FakeDialer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reachable(self, addr: SocketAddr) -> Self {
        self.set_reachable(addr);
        self
    }

    pub fn set_reachable(&self, addr: SocketAddr) {
        self.reachable.lock().insert(addr);
    }

    /// Make every dial take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Every node dialed so far, in order.
    pub fn attempts(&self) -> Vec<Node> {
        self.attempts.lock().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }
}

#[async_trait]
impl NodeDialer for FakeDialer {
    async fn dial(&self, node: &Node) -> Result<Connection, DialError> {
        self.attempts.lock().push(node.clone());
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let addr = node.addr.ok_or(DialError::NoAddress(node.id))?;
        if self.reachable.lock().contains(&addr) {
            let (local, _remote) = tokio::io::duplex(64);
            Ok(Box::new(local))
        } else {
            Err(DialError::Io {
                addr,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        }
    }
}

// =============================================================================
// CONNECTION HANDLER
// =============================================================================

/// Session layer stand-in that records accepted connections.
///
/// When attached to a [`DialLoopHandle`], every accepted connection is
/// reported back as a new peer, the way a real handshake layer would.
#[derive(Debug, Default)]
pub struct RecordingConnectionHandler {
    accepted: Mutex<Vec<(Node, ConnFlags)>>,
    rejected: Mutex<HashSet<NodeId>>,
    control: Mutex<Option<DialLoopHandle>>,
}

impl RecordingConnectionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the handshake with `id`.
    pub fn reject(&self, id: NodeId) {
        self.rejected.lock().insert(id);
    }

    /// Report accepted connections to `handle`.
    pub fn attach(&self, handle: DialLoopHandle) {
        *self.control.lock() = Some(handle);
    }

    pub fn accepted(&self) -> Vec<(Node, ConnFlags)> {
        self.accepted.lock().clone()
    }
}

#[async_trait]
impl ConnectionHandler for RecordingConnectionHandler {
    async fn setup_conn(
        &self,
        _conn: Connection,
        flags: ConnFlags,
        node: &Node,
    ) -> Result<(), SetupError> {
        if self.rejected.lock().contains(&node.id) {
            return Err(SetupError::Handshake {
                id: node.id,
                reason: "rejected by test handler".to_string(),
            });
        }
        self.accepted.lock().push((node.clone(), flags));

        let control = self.control.lock().clone();
        if let Some(control) = control {
            control
                .peer_added(node.id, flags)
                .await
                .map_err(|_| SetupError::Closed)?;
        }
        Ok(())
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Start at the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
