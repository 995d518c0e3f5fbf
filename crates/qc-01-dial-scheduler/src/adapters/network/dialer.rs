use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::trace;

use crate::domain::{DialConfig, DialError, Node, DEFAULT_DIAL_TIMEOUT};
use crate::ports::{Connection, NodeDialer};

// ============================================================================
// TcpDialer - Outbound TCP connections
// ============================================================================

/// Dials nodes over TCP.
///
/// Every attempt is bounded by `timeout`; an expired attempt is reported as
/// [`DialError::Timeout`].
#[derive(Debug, Clone, Copy)]
pub struct TcpDialer {
    timeout: Duration,
}

impl TcpDialer {
    /// Create a dialer with the given connect timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Create a dialer with the configured `dial_timeout_secs`.
    #[must_use]
    pub fn from_config(config: &DialConfig) -> Self {
        Self::new(config.dial_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new(DEFAULT_DIAL_TIMEOUT)
    }
}

#[async_trait]
impl NodeDialer for TcpDialer {
    async fn dial(&self, node: &Node) -> Result<Connection, DialError> {
        let addr = node.addr.ok_or(DialError::NoAddress(node.id))?;
        trace!(id = %node.id, %addr, "TCP connect");

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DialError::Timeout(addr))?
            .map_err(|source| DialError::Io { addr, source })?;

        // Handshake messages are small; don't batch them.
        stream
            .set_nodelay(true)
            .map_err(|source| DialError::Io { addr, source })?;

        Ok(Box::new(stream))
    }
}
