//! Domain Errors for Dial Scheduling
//!
//! Admissibility rejections are expected and only filter candidates. Dial,
//! resolve and setup failures are recoverable and feed the dial history.

use std::net::SocketAddr;

use thiserror::Error;

use super::entities::NodeId;

/// Why a candidate node may not be dialed right now.
///
/// Checked in declaration order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DialCheckError {
    /// A dial to this node is already in flight.
    #[error("already dialing")]
    AlreadyDialing,
    /// The node is already a connected peer.
    #[error("already connected")]
    AlreadyConnected,
    /// The node is the local node.
    #[error("is self")]
    IsSelf,
    /// The node's IP is outside the configured allow-list.
    #[error("not contained in netrestrict whitelist")]
    NotWhitelisted,
    /// The node has an unexpired dial history entry.
    #[error("recently dialed")]
    RecentlyDialed,
}

impl DialCheckError {
    /// Whether a static node rejected for this reason is dropped from the
    /// static set for good.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::IsSelf | Self::NotWhitelisted)
    }
}

/// Transport-level connect failure.
#[derive(Debug, Error)]
pub enum DialError {
    /// The node has no endpoint to connect to.
    #[error("node {0:?} has no known address")]
    NoAddress(NodeId),
    /// The connect attempt did not finish in time.
    #[error("connect to {0} timed out")]
    Timeout(SocketAddr),
    /// The socket layer reported an error.
    #[error("connect to {addr} failed: {source}")]
    Io {
        /// Endpoint that was dialed.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the session layer after the socket was established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The protocol handshake was rejected.
    #[error("handshake with {id:?} failed: {reason}")]
    Handshake {
        /// Remote node.
        id: NodeId,
        /// Handshake failure reason.
        reason: String,
    },
    /// The session layer is no longer accepting connections.
    #[error("connection handler closed")]
    Closed,
}

/// Terminal failure of a dial task.
#[derive(Debug, Error)]
pub enum DialTaskError {
    /// The node's endpoint could not be resolved.
    #[error("could not resolve {0:?}")]
    Unresolved(NodeId),
    /// Connecting failed.
    #[error(transparent)]
    Dial(#[from] DialError),
    /// Connected, but the session could not be set up.
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Invalid textual node record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeParseError {
    /// Identifier is not 64 hex characters.
    #[error("invalid node id: {0}")]
    InvalidId(String),
    /// Endpoint is not a valid `ip:port`.
    #[error("invalid node address: {0}")]
    InvalidAddress(String),
}

/// Invalid allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetlistError {
    /// Entry is not a valid CIDR network.
    #[error("invalid CIDR network: {0}")]
    InvalidCidr(String),
}

/// The dial loop is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DialLoopError {
    /// The loop has shut down and dropped its command channel.
    #[error("dial loop is closed")]
    Closed,
}

/// Invalid or unreadable dial configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has wrongly typed fields.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A static node or bootnode entry is malformed.
    #[error(transparent)]
    Node(#[from] NodeParseError),
    /// The netrestrict list is malformed.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
    /// Values parse but contradict each other.
    #[error("invalid dial config: {0}")]
    Invalid(String),
}
