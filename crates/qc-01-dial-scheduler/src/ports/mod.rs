//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** how the node steers the dial loop
//! - **Driven Ports (Outbound):** discovery, transport, session setup and
//!   time, as consumed by the scheduler and its task runtime

pub mod inbound;
pub mod outbound;

pub use inbound::DialControl;
pub use outbound::{AsyncConn, Clock, Connection, ConnectionHandler, DiscoveryTable, NodeDialer};
