//! # Dial Loop
//!
//! The executor that drives a [`DialScheduler`]. A single tokio task owns the
//! scheduler and the connected-peer map; everything else talks to it through
//! a [`DialLoopHandle`].
//!
//! ## Loop Iteration
//!
//! 1. Start queued tasks while fewer than `max_active_dial_tasks` run
//! 2. If there is still room, plan new tasks and start or queue them
//! 3. Wait for a finished task, a command, or shutdown
//!
//! Finished tasks come back over a channel and are folded into the scheduler
//! with `on_task_done` before the next planning pass.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::runtime::TaskRuntime;
use crate::adapters::{SystemClock, TcpDialer};
use crate::domain::{
    ConfigError, ConnFlags, ConnectedPeers, DialConfig, DialLoopError, DialScheduler, DialStats,
    Node, NodeId, Task,
};
use crate::ports::{Clock, ConnectionHandler, DialControl, DiscoveryTable, NodeDialer};

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 64;

#[derive(Debug)]
enum Command {
    AddStatic(Node),
    RemoveStatic(NodeId),
    PeerAdded(NodeId, ConnFlags),
    PeerRemoved(NodeId),
    Stats(oneshot::Sender<DialStats>),
}

// =============================================================================
// DIAL LOOP
// =============================================================================

/// Owns the scheduler and runs its tasks.
pub struct DialLoop {
    scheduler: DialScheduler,
    runtime: Arc<TaskRuntime>,
    clock: Arc<dyn Clock>,
    max_active_dial_tasks: usize,

    peers: ConnectedPeers,
    queued: VecDeque<Task>,
    running: usize,

    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
    done_tx: mpsc::UnboundedSender<Task>,
    done_rx: mpsc::UnboundedReceiver<Task>,
}

impl DialLoop {
    /// Create a loop around an existing scheduler.
    ///
    /// A `max_active_dial_tasks` of zero is treated as one.
    pub fn new(
        scheduler: DialScheduler,
        runtime: TaskRuntime,
        clock: Arc<dyn Clock>,
        max_active_dial_tasks: usize,
    ) -> (Self, DialLoopHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let dial_loop = Self {
            scheduler,
            runtime: Arc::new(runtime),
            clock,
            max_active_dial_tasks: max_active_dial_tasks.max(1),
            peers: ConnectedPeers::new(),
            queued: VecDeque::new(),
            running: 0,
            commands: command_rx,
            shutdown: shutdown_rx,
            done_tx,
            done_rx,
        };
        let handle = DialLoopHandle {
            commands: command_tx,
            shutdown: Arc::new(shutdown_tx),
        };
        (dial_loop, handle)
    }

    /// Build the scheduler, runtime and loop from a validated config.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid or contains malformed node or
    /// netrestrict entries.
    pub fn from_config(
        config: &DialConfig,
        dialer: Arc<dyn NodeDialer>,
        table: Option<Arc<dyn DiscoveryTable>>,
        handler: Arc<dyn ConnectionHandler>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, DialLoopHandle), ConfigError> {
        config.validate()?;

        let scheduler = DialScheduler::new(
            config.static_nodes()?,
            config.bootnodes()?,
            table.clone(),
            config.netrestrict()?,
            config.scheduler_config(),
        );
        let runtime = TaskRuntime::new(
            dialer,
            table,
            handler,
            Arc::clone(&clock),
            config.lookup_interval(),
        );

        Ok(Self::new(
            scheduler,
            runtime,
            clock,
            config.max_active_dial_tasks,
        ))
    }

    /// Build a loop that dials over TCP with the configured timeout and runs
    /// on the system clock.
    ///
    /// # Errors
    ///
    /// Same as [`DialLoop::from_config`].
    pub fn with_tcp_dialer(
        config: &DialConfig,
        table: Option<Arc<dyn DiscoveryTable>>,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<(Self, DialLoopHandle), ConfigError> {
        Self::from_config(
            config,
            Arc::new(TcpDialer::from_config(config)),
            table,
            handler,
            Arc::new(SystemClock::new()),
        )
    }

    /// Run the loop on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) {
        info!(
            max_active_dial_tasks = self.max_active_dial_tasks,
            max_dynamic_dials = self.scheduler.config().max_dynamic_dials,
            static_nodes = self.scheduler.static_nodes().count(),
            "Dial loop started"
        );

        loop {
            if *self.shutdown.borrow_and_update() {
                break;
            }
            self.schedule_tasks();

            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(task) = self.done_rx.recv() => {
                    self.running = self.running.saturating_sub(1);
                    debug!(task = %task, "Task done");
                    self.scheduler.on_task_done(task, self.clock.now());
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        info!(
            running = self.running,
            queued = self.queued.len(),
            "Dial loop stopped"
        );
    }

    fn schedule_tasks(&mut self) {
        self.start_queued();

        if self.running < self.max_active_dial_tasks {
            let now = self.clock.now();
            let planned = self
                .scheduler
                .plan(self.running + self.queued.len(), &self.peers, now);
            self.queued.extend(planned);
            self.start_queued();
        }
    }

    fn start_queued(&mut self) {
        while self.running < self.max_active_dial_tasks {
            let Some(task) = self.queued.pop_front() else {
                break;
            };
            self.start_task(task);
        }
    }

    fn start_task(&mut self, task: Task) {
        debug!(task = %task, "Starting task");
        self.running += 1;

        let runtime = Arc::clone(&self.runtime);
        let done = self.done_tx.clone();
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                task = runtime.run(task) => {
                    // Only fails once the loop itself is gone.
                    let _ = done.send(task);
                }
                _ = shutdown.changed() => {}
            }
        });
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::AddStatic(node) => {
                info!(node = %node, "Adding static node");
                self.scheduler.add_static(node);
            }
            Command::RemoveStatic(id) => {
                if self.scheduler.remove_static(&id) {
                    info!(id = %id, "Removed static node");
                }
            }
            Command::PeerAdded(id, flags) => {
                debug!(id = %id, %flags, "Peer added");
                self.peers.insert(id, flags);
            }
            Command::PeerRemoved(id) => {
                debug!(id = %id, "Peer removed");
                self.peers.remove(&id);
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn stats(&self) -> DialStats {
        DialStats {
            dialing: self.scheduler.dialing_count(),
            static_nodes: self.scheduler.static_nodes().count(),
            history_len: self.scheduler.history_len(),
            lookup_buffered: self.scheduler.lookup_buffer_len(),
            running: self.running,
            queued: self.queued.len(),
            peers: self.peers.len(),
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable control handle for a [`DialLoop`].
#[derive(Debug, Clone)]
pub struct DialLoopHandle {
    commands: mpsc::Sender<Command>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl DialLoopHandle {
    /// Whether the loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), DialLoopError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DialLoopError::Closed)
    }
}

#[async_trait]
impl DialControl for DialLoopHandle {
    async fn add_static(&self, node: Node) -> Result<(), DialLoopError> {
        self.send(Command::AddStatic(node)).await
    }

    async fn remove_static(&self, id: NodeId) -> Result<(), DialLoopError> {
        self.send(Command::RemoveStatic(id)).await
    }

    async fn peer_added(&self, id: NodeId, flags: ConnFlags) -> Result<(), DialLoopError> {
        self.send(Command::PeerAdded(id, flags)).await
    }

    async fn peer_removed(&self, id: NodeId) -> Result<(), DialLoopError> {
        self.send(Command::PeerRemoved(id)).await
    }

    async fn stats(&self) -> Result<DialStats, DialLoopError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Stats(reply_tx)).await?;
        reply_rx.await.map_err(|_| DialLoopError::Closed)
    }

    async fn shutdown(&self) -> Result<(), DialLoopError> {
        self.shutdown
            .send(true)
            .map_err(|_| DialLoopError::Closed)
    }
}
