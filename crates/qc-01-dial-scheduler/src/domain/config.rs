//! Dial loop configuration.

use std::time::Duration;

use serde::Deserialize;

use super::entities::Node;
use super::errors::ConfigError;
use super::netlist::Netlist;
use super::value_objects::{
    SchedulerConfig, DEFAULT_MAX_DYNAMIC_DIALS, DIAL_HISTORY_EXPIRATION, FALLBACK_INTERVAL,
    INITIAL_RESOLVE_DELAY, LOOKUP_INTERVAL, MAX_CONFIG_INTERVAL, MAX_RESOLVE_DELAY,
};

/// Default cap on concurrently running tasks.
pub const DEFAULT_MAX_ACTIVE_DIAL_TASKS: usize = 16;

/// Default TCP connect timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Dial loop configuration, as read from the `[dial]` table of a config file.
///
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DialConfig {
    /// Cap on dynamic connections plus in-flight dynamic dials
    pub max_dynamic_dials: usize,
    /// Cap on concurrently running tasks; the rest are queued
    pub max_active_dial_tasks: usize,
    /// Seconds a finished dial suppresses redialing the same node
    pub dial_history_expiration_secs: u64,
    /// Minimum seconds between discovery lookups
    pub lookup_interval_secs: u64,
    /// Seconds without peers before bootnodes are dialed
    pub fallback_interval_secs: u64,
    /// First resolve backoff (seconds)
    pub initial_resolve_delay_secs: u64,
    /// Resolve backoff ceiling (seconds)
    pub max_resolve_delay_secs: u64,
    /// TCP connect timeout (seconds)
    pub dial_timeout_secs: u64,
    /// `<hex-id>@<ip>:<port>` or bare `<hex-id>` entries
    pub static_nodes: Vec<String>,
    /// `<hex-id>@<ip>:<port>` entries
    pub bootnodes: Vec<String>,
    /// Comma-separated CIDR allow-list, e.g. `"10.0.0.0/8,fd00::/8"`
    pub netrestrict: Option<String>,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            max_dynamic_dials: DEFAULT_MAX_DYNAMIC_DIALS,
            max_active_dial_tasks: DEFAULT_MAX_ACTIVE_DIAL_TASKS,
            dial_history_expiration_secs: DIAL_HISTORY_EXPIRATION.as_secs(),
            lookup_interval_secs: LOOKUP_INTERVAL.as_secs(),
            fallback_interval_secs: FALLBACK_INTERVAL.as_secs(),
            initial_resolve_delay_secs: INITIAL_RESOLVE_DELAY.as_secs(),
            max_resolve_delay_secs: MAX_RESOLVE_DELAY.as_secs(),
            dial_timeout_secs: DEFAULT_DIAL_TIMEOUT.as_secs(),
            static_nodes: Vec::new(),
            bootnodes: Vec::new(),
            netrestrict: None,
        }
    }
}

impl DialConfig {
    /// Small caps and short timeouts for tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        Self {
            max_dynamic_dials: 4,
            max_active_dial_tasks: 4,
            dial_timeout_secs: 1,
            ..Self::default()
        }
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_dial_tasks == 0 {
            return Err(ConfigError::Invalid(
                "max_active_dial_tasks must be at least 1".to_string(),
            ));
        }
        let intervals = [
            ("dial_history_expiration_secs", self.dial_history_expiration_secs),
            ("lookup_interval_secs", self.lookup_interval_secs),
            ("fallback_interval_secs", self.fallback_interval_secs),
            ("initial_resolve_delay_secs", self.initial_resolve_delay_secs),
            ("max_resolve_delay_secs", self.max_resolve_delay_secs),
            ("dial_timeout_secs", self.dial_timeout_secs),
        ];
        for (name, secs) in intervals {
            if secs > MAX_CONFIG_INTERVAL.as_secs() {
                return Err(ConfigError::Invalid(format!(
                    "{name} ({secs}) exceeds {} seconds",
                    MAX_CONFIG_INTERVAL.as_secs()
                )));
            }
        }
        if self.initial_resolve_delay_secs > self.max_resolve_delay_secs {
            return Err(ConfigError::Invalid(format!(
                "initial_resolve_delay_secs ({}) exceeds max_resolve_delay_secs ({})",
                self.initial_resolve_delay_secs, self.max_resolve_delay_secs
            )));
        }
        Ok(())
    }

    /// Parsed static node entries.
    pub fn static_nodes(&self) -> Result<Vec<Node>, ConfigError> {
        parse_nodes(&self.static_nodes)
    }

    /// Parsed bootnode entries.
    pub fn bootnodes(&self) -> Result<Vec<Node>, ConfigError> {
        parse_nodes(&self.bootnodes)
    }

    /// Parsed allow-list; `None` when unset or blank.
    pub fn netrestrict(&self) -> Result<Option<Netlist>, ConfigError> {
        match self.netrestrict.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(list) => Ok(Some(list.parse()?)),
        }
    }

    pub fn lookup_interval(&self) -> Duration {
        Duration::from_secs(self.lookup_interval_secs)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// The subset the scheduler itself needs.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_dynamic_dials: self.max_dynamic_dials,
            dial_history_expiration: Duration::from_secs(self.dial_history_expiration_secs),
            fallback_interval: Duration::from_secs(self.fallback_interval_secs),
            initial_resolve_delay: Duration::from_secs(self.initial_resolve_delay_secs),
            max_resolve_delay: Duration::from_secs(self.max_resolve_delay_secs),
        }
    }
}

fn parse_nodes(entries: &[String]) -> Result<Vec<Node>, ConfigError> {
    entries
        .iter()
        .map(|entry| entry.parse::<Node>().map_err(ConfigError::from))
        .collect()
}
