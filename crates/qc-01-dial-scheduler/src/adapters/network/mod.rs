//! # Network Adapters
//!
//! Production adapters for the dial loop.
//!
//! ## Adapters Provided
//!
//! - `TcpDialer` - TCP connect with a per-attempt timeout
//! - `SystemClock` - Monotonic clock backed by the tokio timer
//! - `TomlConfigProvider` - Loads `DialConfig` from a TOML file

/// Configuration providers
pub mod config;
/// Outbound transport
pub mod dialer;
/// Clock adapters
pub mod time;

pub use config::TomlConfigProvider;
pub use dialer::TcpDialer;
pub use time::SystemClock;

#[cfg(test)]
mod tests;
