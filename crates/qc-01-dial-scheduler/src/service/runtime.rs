//! Task execution.
//!
//! `TaskRuntime` holds the capabilities tasks run against and executes one
//! task at a time per call. It never touches scheduler state; the dial loop
//! hands the finished task back to the scheduler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::{
    DialOutcome, DialTask, DialTaskError, DiscoveryTask, NodeId, Task, WaitTask,
};
use crate::ports::{Clock, ConnectionHandler, DiscoveryTable, NodeDialer};

// =============================================================================
// TASK RUNTIME
// =============================================================================

/// Shared capabilities for running dial, discovery and wait tasks.
pub struct TaskRuntime {
    dialer: Arc<dyn NodeDialer>,
    table: Option<Arc<dyn DiscoveryTable>>,
    handler: Arc<dyn ConnectionHandler>,
    clock: Arc<dyn Clock>,
    lookup_interval: Duration,
    /// Start of the last discovery lookup.
    last_lookup: Mutex<Option<Instant>>,
}

impl TaskRuntime {
    pub fn new(
        dialer: Arc<dyn NodeDialer>,
        table: Option<Arc<dyn DiscoveryTable>>,
        handler: Arc<dyn ConnectionHandler>,
        clock: Arc<dyn Clock>,
        lookup_interval: Duration,
    ) -> Self {
        Self {
            dialer,
            table,
            handler,
            clock,
            lookup_interval,
            last_lookup: Mutex::new(None),
        }
    }

    /// Run `task` to completion and return it with its results filled in.
    pub async fn run(&self, task: Task) -> Task {
        match task {
            Task::Dial(mut dial) => {
                self.run_dial(&mut dial).await;
                Task::Dial(dial)
            }
            Task::Discovery(mut lookup) => {
                self.run_discovery(&mut lookup).await;
                Task::Discovery(lookup)
            }
            Task::Wait(wait) => {
                self.run_wait(&wait).await;
                Task::Wait(wait)
            }
        }
    }

    /// Resolve if needed, dial, and hand the connection to the session layer.
    ///
    /// A static node whose dial fails at the transport level is re-resolved
    /// and dialed once more, in case its endpoint changed.
    pub async fn run_dial(&self, task: &mut DialTask) {
        let outcome = match self.execute_dial(task).await {
            Ok(()) => DialOutcome::Connected,
            Err(err) => DialOutcome::Failed(err),
        };
        task.outcome = Some(outcome);
    }

    async fn execute_dial(&self, task: &mut DialTask) -> Result<(), DialTaskError> {
        if task.dest.is_incomplete() && !self.resolve(task).await {
            return Err(DialTaskError::Unresolved(task.id()));
        }

        match self.dial(task).await {
            Err(DialTaskError::Dial(err)) if task.is_static() => {
                debug!(task = %task, %err, "Static dial failed, re-resolving");
                if self.resolve(task).await {
                    self.dial(task).await
                } else {
                    Err(DialTaskError::Dial(err))
                }
            }
            result => result,
        }
    }

    async fn dial(&self, task: &DialTask) -> Result<(), DialTaskError> {
        let conn = self.dialer.dial(&task.dest).await?;
        self.handler
            .setup_conn(conn, task.flags, &task.dest)
            .await?;
        Ok(())
    }

    /// Look up the current endpoint of the task's node.
    ///
    /// Attempts are spaced by the task's resolve backoff, which doubles on
    /// every failure. Returns whether `task.dest` now holds a fresh endpoint.
    pub async fn resolve(&self, task: &mut DialTask) -> bool {
        let Some(table) = &self.table else {
            debug!(id = %task.id(), "Can't resolve node without discovery table");
            return false;
        };
        let now = self.clock.now();
        if !task.resolve.should_attempt(now) {
            trace!(id = %task.id(), delay = ?task.resolve.delay(), "Resolve backoff active");
            return false;
        }

        match table.resolve(task.id()).await {
            Some(node) if !node.is_incomplete() => {
                task.resolve.record_success(now);
                debug!(id = %task.id(), addr = ?node.addr, "Resolved node");
                task.dest = node;
                true
            }
            _ => {
                task.resolve.record_failure(now);
                debug!(id = %task.id(), delay = ?task.resolve.delay(), "Resolving node failed");
                false
            }
        }
    }

    /// Run one lookup towards a random target.
    ///
    /// Lookup starts are spaced at least `lookup_interval` apart. A slow
    /// lookup eats into the interval rather than extending it.
    pub async fn run_discovery(&self, task: &mut DiscoveryTask) {
        let Some(table) = &self.table else {
            return;
        };

        let last_lookup = *self.last_lookup.lock();
        let wait = last_lookup.map(|last| {
            last.checked_add(self.lookup_interval)
                .map_or(self.lookup_interval, |next| {
                    next.saturating_duration_since(self.clock.now())
                })
        });
        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            trace!(?wait, "Delaying discovery lookup");
            tokio::time::sleep(wait).await;
        }

        *self.last_lookup.lock() = Some(self.clock.now());
        let target = NodeId::random();
        task.target = Some(target);
        task.results = table.lookup(target).await;
    }

    pub async fn run_wait(&self, task: &WaitTask) {
        tokio::time::sleep(task.duration).await;
    }
}
