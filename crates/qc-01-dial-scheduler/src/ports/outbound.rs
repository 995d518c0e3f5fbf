//! # Driven Ports (Outbound SPI)
//!
//! The capabilities the dial scheduler and its task runtime consume. All of
//! them are replaceable so scheduling logic can be exercised without sockets;
//! see `test_utils` for deterministic fakes.

use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::{ConnFlags, DialError, Node, NodeId, SetupError};

/// A bidirectional byte stream.
pub trait AsyncConn: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncConn for T {}

/// An established outbound connection.
pub type Connection = Box<dyn AsyncConn>;

/// Discovery table: the source of candidate nodes.
///
/// # Thread Safety
///
/// `read_random_nodes` and `self_id` are called from the planning loop and
/// must not block. `resolve` and `lookup` run on task workers and may take as
/// long as the table's own request timeout.
#[async_trait]
pub trait DiscoveryTable: Send + Sync {
    /// Identity of the local node.
    fn self_id(&self) -> NodeId;

    /// Look up the current endpoint of `id`. `None` if it cannot be found.
    async fn resolve(&self, id: NodeId) -> Option<Node>;

    /// Run a neighbor lookup towards `target` and return the nodes found.
    async fn lookup(&self, target: NodeId) -> Vec<Node>;

    /// Up to `max` random known nodes from the table.
    fn read_random_nodes(&self, max: usize) -> Vec<Node>;
}

/// Performs the transport-level connection attempt.
#[async_trait]
pub trait NodeDialer: Send + Sync {
    /// Connect to `node`, whose address must be complete.
    async fn dial(&self, node: &Node) -> Result<Connection, DialError>;
}

/// Session layer that takes over a freshly dialed connection
/// (protocol handshake, peer registration).
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    async fn setup_conn(
        &self,
        conn: Connection,
        flags: ConnFlags,
        node: &Node,
    ) -> Result<(), SetupError>;
}

/// Monotonic time source, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}
