//! # Scheduled Tasks
//!
//! The units of work produced by a planning cycle. Each variant carries only
//! its own state; execution lives in `service::TaskRuntime`, and results flow
//! back to the scheduler when the finished task is handed to
//! `DialScheduler::on_task_done`.
//!
//! ```text
//! Dial:      created -> (resolving)? -> dialing -> succeeded | failed
//!            failed(static) -> resolving -> dialing -> succeeded | failed
//! Discovery: created -> rate-limited wait -> querying -> completed
//! Wait:      created -> sleeping -> completed
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use super::entities::{ConnFlags, Node, NodeId};
use super::errors::DialTaskError;

/// One schedulable unit of concurrent work.
#[derive(Debug)]
pub enum Task {
    /// Connect to a node.
    Dial(DialTask),
    /// Run a discovery lookup to refill the candidate buffer.
    Discovery(DiscoveryTask),
    /// Sleep until the dial history has something to expire.
    Wait(WaitTask),
}

impl Task {
    /// The dial task, if this is one.
    pub fn as_dial(&self) -> Option<&DialTask> {
        match self {
            Task::Dial(task) => Some(task),
            _ => None,
        }
    }

    pub fn is_dial(&self) -> bool {
        matches!(self, Task::Dial(_))
    }

    pub fn is_discovery(&self) -> bool {
        matches!(self, Task::Discovery(_))
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Task::Wait(_))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Dial(task) => fmt::Display::fmt(task, f),
            Task::Discovery(task) => fmt::Display::fmt(task, f),
            Task::Wait(task) => fmt::Display::fmt(task, f),
        }
    }
}

// =============================================================================
// RESOLVE BACKOFF
// =============================================================================

/// Exponential backoff between attempts to resolve a node's endpoint.
///
/// The delay doubles on every failed resolve up to `max`, and resets to
/// `initial` on success. The first attempt is never delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveBackoff {
    last_resolved: Option<Instant>,
    delay: Duration,
    initial: Duration,
    max: Duration,
}

impl ResolveBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            last_resolved: None,
            delay: initial,
            initial,
            max,
        }
    }

    /// Current delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// When the last attempt finished.
    pub fn last_resolved(&self) -> Option<Instant> {
        self.last_resolved
    }

    /// Whether enough time has passed since the last attempt.
    pub fn should_attempt(&self, now: Instant) -> bool {
        match self.last_resolved {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.delay,
        }
    }

    /// Record a failed attempt and back off.
    pub fn record_failure(&mut self, now: Instant) {
        self.last_resolved = Some(now);
        self.delay = self.delay.saturating_mul(2).min(self.max);
    }

    /// Record a successful attempt and reset the delay.
    pub fn record_success(&mut self, now: Instant) {
        self.last_resolved = Some(now);
        self.delay = self.initial;
    }
}

// =============================================================================
// DIAL TASK
// =============================================================================

/// How a dial task ended.
#[derive(Debug)]
pub enum DialOutcome {
    /// Connected and handed to the session layer.
    Connected,
    /// Gave up.
    Failed(DialTaskError),
}

/// Connect to a single node.
#[derive(Debug)]
pub struct DialTask {
    /// Why this node is being dialed.
    pub flags: ConnFlags,
    /// Target node. Replaced with the resolved record after a successful
    /// resolve.
    pub dest: Node,
    /// Resolve backoff state.
    pub resolve: ResolveBackoff,
    /// Set by the runtime once the task has run.
    pub outcome: Option<DialOutcome>,
}

impl DialTask {
    pub fn new(flags: ConnFlags, dest: Node, resolve: ResolveBackoff) -> Self {
        Self {
            flags,
            dest,
            resolve,
            outcome: None,
        }
    }

    /// Id of the target node.
    pub fn id(&self) -> NodeId {
        self.dest.id
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(ConnFlags::STATIC)
    }

    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(ConnFlags::DYNAMIC)
    }

    /// Whether the task ran and connected.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Some(DialOutcome::Connected))
    }
}

impl fmt::Display for DialTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dest.addr {
            Some(addr) => write!(f, "{} {} {}", self.flags, self.dest.id.short(), addr),
            None => write!(f, "{} {} (unresolved)", self.flags, self.dest.id.short()),
        }
    }
}

// =============================================================================
// DISCOVERY TASK
// =============================================================================

/// Run one neighbor lookup against the discovery table.
#[derive(Debug, Default)]
pub struct DiscoveryTask {
    /// Random lookup target, chosen when the task runs.
    pub target: Option<NodeId>,
    /// Nodes returned by the lookup.
    pub results: Vec<Node>,
}

impl DiscoveryTask {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for DiscoveryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("discovery lookup")?;
        if !self.results.is_empty() {
            write!(f, " ({} results)", self.results.len())?;
        }
        Ok(())
    }
}

// =============================================================================
// WAIT TASK
// =============================================================================

/// Sleep so the planning loop does not spin while only history expiry can
/// unblock it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTask {
    pub duration: Duration,
}

impl WaitTask {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl fmt::Display for WaitTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wait for dial hist expire ({:?})", self.duration)
    }
}
