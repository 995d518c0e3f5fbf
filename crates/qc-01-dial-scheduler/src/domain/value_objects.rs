//! Value Objects for Dial Scheduling
//!
//! Timing constants and the scheduler's own tuning parameters.

use std::time::Duration;

/// How long a finished dial suppresses another attempt to the same node.
pub const DIAL_HISTORY_EXPIRATION: Duration = Duration::from_secs(30);

/// Minimum spacing between two discovery lookups.
pub const LOOKUP_INTERVAL: Duration = Duration::from_secs(4);

/// How long the scheduler waits without any peers before it falls back to
/// dialing bootnodes.
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(20);

/// First delay between resolve attempts for an incomplete node.
pub const INITIAL_RESOLVE_DELAY: Duration = Duration::from_secs(60);

/// Ceiling for the resolve backoff.
pub const MAX_RESOLVE_DELAY: Duration = Duration::from_secs(60 * 60);

/// Upper bound accepted for any configured interval or timeout.
pub const MAX_CONFIG_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default cap on dynamically dialed connections.
pub const DEFAULT_MAX_DYNAMIC_DIALS: usize = 50;

/// Tuning parameters of the dial scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Cap on dynamic-flagged connections plus in-flight dynamic dials.
    pub max_dynamic_dials: usize,
    /// Suppression window recorded after every finished dial.
    pub dial_history_expiration: Duration,
    /// Time without peers after which bootnodes are dialed.
    pub fallback_interval: Duration,
    /// Initial resolve backoff for new dial tasks.
    pub initial_resolve_delay: Duration,
    /// Resolve backoff ceiling.
    pub max_resolve_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_dynamic_dials: DEFAULT_MAX_DYNAMIC_DIALS,
            dial_history_expiration: DIAL_HISTORY_EXPIRATION,
            fallback_interval: FALLBACK_INTERVAL,
            initial_resolve_delay: INITIAL_RESOLVE_DELAY,
            max_resolve_delay: MAX_RESOLVE_DELAY,
        }
    }
}

impl SchedulerConfig {
    /// Default timings with a specific dynamic dial cap.
    pub fn with_max_dynamic_dials(max_dynamic_dials: usize) -> Self {
        Self {
            max_dynamic_dials,
            ..Self::default()
        }
    }
}

/// Point-in-time counters of a running dial loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialStats {
    /// Dials in flight.
    pub dialing: usize,
    /// Configured static nodes.
    pub static_nodes: usize,
    /// Unexpired dial history entries.
    pub history_len: usize,
    /// Lookup results waiting to be dialed.
    pub lookup_buffered: usize,
    /// Tasks currently executing.
    pub running: usize,
    /// Tasks planned but not yet started.
    pub queued: usize,
    /// Connected peers.
    pub peers: usize,
}
