//! # Driving Ports (Inbound API)
//!
//! The API the node uses to steer a running dial loop.

use async_trait::async_trait;

use crate::domain::{ConnFlags, DialLoopError, DialStats, Node, NodeId};

/// Control surface of a running dial loop.
///
/// Every call is a message to the loop; it returns once the message is
/// queued, not once it has been acted on. All calls fail with
/// [`DialLoopError::Closed`] after shutdown.
///
/// # Example
///
/// ```rust,ignore
/// use qc_01_dial_scheduler::ports::DialControl;
///
/// async fn on_handshake_done<C: DialControl>(
///     control: &C,
///     id: NodeId,
///     flags: ConnFlags,
/// ) -> Result<(), DialLoopError> {
///     control.peer_added(id, flags).await
/// }
/// ```
#[async_trait]
pub trait DialControl: Send + Sync {
    /// Start keeping a connection to `node`.
    async fn add_static(&self, node: Node) -> Result<(), DialLoopError>;

    /// Stop dialing `id`. An existing connection is left alone.
    async fn remove_static(&self, id: NodeId) -> Result<(), DialLoopError>;

    /// Report a newly established peer connection (inbound or outbound).
    async fn peer_added(&self, id: NodeId, flags: ConnFlags) -> Result<(), DialLoopError>;

    /// Report a dropped peer connection.
    async fn peer_removed(&self, id: NodeId) -> Result<(), DialLoopError>;

    /// Current loop counters.
    async fn stats(&self) -> Result<DialStats, DialLoopError>;

    /// Stop the loop. Running tasks are abandoned.
    async fn shutdown(&self) -> Result<(), DialLoopError>;
}
