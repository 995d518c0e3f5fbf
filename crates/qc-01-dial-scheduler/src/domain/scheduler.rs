//! # Dial Scheduler
//!
//! Decides, once per scheduling tick, which nodes to dial next.
//!
//! ## Planning Order
//!
//! Every call to [`DialScheduler::plan`] runs the same steps in the same
//! order, so fixtures can rely on the precedence:
//!
//! 1. static nodes (not subject to the dynamic cap)
//! 2. bootnode fallback when no peers are connected
//! 3. random nodes from the discovery table
//! 4. nodes buffered from earlier lookups, oldest first
//! 5. a new discovery lookup when the buffer runs low
//! 6. a wait task when nothing else can make progress
//!
//! ## Concurrency
//!
//! The scheduler has no internal locking. `plan` and `on_task_done` must be
//! called from a single owner; `service::DialLoop` is that owner in a running
//! node. Tasks never touch scheduler state while they run, they hand their
//! results back through `on_task_done`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use super::dial_history::DialHistory;
use super::entities::{ConnFlags, Node, NodeId};
use super::errors::DialCheckError;
use super::netlist::Netlist;
use super::tasks::{DialOutcome, DialTask, DiscoveryTask, ResolveBackoff, Task, WaitTask};
use super::value_objects::{SchedulerConfig, MAX_CONFIG_INTERVAL};
use crate::ports::DiscoveryTable;

/// Currently connected peers and the flags of their connections.
pub type ConnectedPeers = HashMap<NodeId, ConnFlags>;

/// A configured static node and the resolve state carried between attempts.
#[derive(Debug, Clone)]
struct StaticDial {
    node: Node,
    resolve: ResolveBackoff,
}

/// Outbound connection planner.
pub struct DialScheduler {
    config: SchedulerConfig,
    table: Option<Arc<dyn DiscoveryTable>>,
    netrestrict: Option<Netlist>,

    lookup_running: bool,
    dialing: HashMap<NodeId, ConnFlags>,
    lookup_buf: VecDeque<Node>,
    static_nodes: BTreeMap<NodeId, StaticDial>,
    history: DialHistory,

    /// Set on the first call to `plan`; drives the bootnode fallback.
    start: Option<Instant>,
    bootnodes: VecDeque<Node>,
}

impl DialScheduler {
    /// Create a scheduler.
    ///
    /// # Arguments
    ///
    /// * `static_nodes` - Peers to keep connected at all times
    /// * `bootnodes` - Peers to dial when no other peer is reachable
    /// * `table` - Discovery table; `None` disables random fill, lookups and
    ///   endpoint resolution
    /// * `netrestrict` - Optional IP allow-list for all dials
    /// * `config` - Dynamic dial cap and timings
    pub fn new(
        static_nodes: Vec<Node>,
        bootnodes: Vec<Node>,
        table: Option<Arc<dyn DiscoveryTable>>,
        netrestrict: Option<Netlist>,
        config: SchedulerConfig,
    ) -> Self {
        let mut scheduler = Self {
            config,
            table,
            netrestrict,
            lookup_running: false,
            dialing: HashMap::new(),
            lookup_buf: VecDeque::new(),
            static_nodes: BTreeMap::new(),
            history: DialHistory::new(),
            start: None,
            bootnodes: bootnodes.into(),
        };
        for node in static_nodes {
            scheduler.add_static(node);
        }
        scheduler
    }

    /// Add (or replace) a static node.
    pub fn add_static(&mut self, node: Node) {
        let resolve = self.new_backoff();
        self.static_nodes
            .insert(node.id, StaticDial { node, resolve });
    }

    /// Stop dialing a static node. An in-flight dial is not cancelled.
    ///
    /// Returns whether the node was configured.
    pub fn remove_static(&mut self, id: &NodeId) -> bool {
        self.static_nodes.remove(id).is_some()
    }

    /// Produce the tasks for this scheduling tick.
    ///
    /// # Arguments
    ///
    /// * `running` - Number of tasks the executor is still running
    /// * `peers` - Currently connected peers
    /// * `now` - Current time
    pub fn plan(&mut self, running: usize, peers: &ConnectedPeers, now: Instant) -> Vec<Task> {
        let start = *self.start.get_or_insert(now);
        let mut tasks = Vec::new();

        let connected_dynamic = peers
            .values()
            .filter(|flags| flags.contains(ConnFlags::DYNAMIC))
            .count();
        let dialing_dynamic = self
            .dialing
            .values()
            .filter(|flags| flags.contains(ConnFlags::DYNAMIC))
            .count();
        let mut need_dynamic = self
            .config
            .max_dynamic_dials
            .saturating_sub(connected_dynamic)
            .saturating_sub(dialing_dynamic);

        self.history.expire(now);

        // Static nodes ignore the dynamic cap.
        let static_ids: Vec<NodeId> = self.static_nodes.keys().copied().collect();
        for id in static_ids {
            let Some(entry) = self.static_nodes.get(&id) else {
                continue;
            };
            match self.check_dial(&entry.node, peers) {
                Ok(()) => {
                    let task = DialTask::new(ConnFlags::STATIC, entry.node.clone(), entry.resolve);
                    self.dialing.insert(id, ConnFlags::STATIC);
                    tasks.push(Task::Dial(task));
                }
                Err(err) if err.is_permanent() => {
                    warn!(id = %id, addr = ?entry.node.addr, %err, "Removing static dial candidate");
                    self.static_nodes.remove(&id);
                }
                Err(err) => {
                    trace!(id = %id, addr = ?entry.node.addr, %err, "Skipping static dial candidate");
                }
            }
        }

        if peers.is_empty()
            && !self.bootnodes.is_empty()
            && need_dynamic > 0
            && now.saturating_duration_since(start) > self.config.fallback_interval
        {
            self.bootnodes.rotate_left(1);
            if let Some(bootnode) = self.bootnodes.back().cloned() {
                if self.add_dial(ConnFlags::DYNAMIC, bootnode, peers, &mut tasks) {
                    need_dynamic -= 1;
                }
            }
        }

        let random_candidates = need_dynamic / 2;
        if random_candidates > 0 {
            let candidates = match &self.table {
                Some(table) => table.read_random_nodes(random_candidates),
                None => Vec::new(),
            };
            for node in candidates.into_iter().take(random_candidates) {
                if self.add_dial(ConnFlags::DYNAMIC, node, peers, &mut tasks) {
                    need_dynamic -= 1;
                }
            }
        }

        // Rejected candidates are consumed too.
        while need_dynamic > 0 {
            let Some(node) = self.lookup_buf.pop_front() else {
                break;
            };
            if self.add_dial(ConnFlags::DYNAMIC, node, peers, &mut tasks) {
                need_dynamic -= 1;
            }
        }

        if self.lookup_buf.len() < need_dynamic && !self.lookup_running && self.table.is_some() {
            self.lookup_running = true;
            tasks.push(Task::Discovery(DiscoveryTask::new()));
        }

        if running == 0 && tasks.is_empty() {
            if let Some(soonest) = self.history.min() {
                let wait = soonest.expiry.saturating_duration_since(now);
                tasks.push(Task::Wait(WaitTask::new(wait)));
            }
        }

        tasks
    }

    /// Admissibility check for a dial candidate.
    ///
    /// Checks run in a fixed order and the first failing one is reported.
    /// An incomplete node never passes a configured allow-list, since there
    /// is no address to check.
    pub fn check_dial(&self, node: &Node, peers: &ConnectedPeers) -> Result<(), DialCheckError> {
        if self.dialing.contains_key(&node.id) {
            return Err(DialCheckError::AlreadyDialing);
        }
        if peers.contains_key(&node.id) {
            return Err(DialCheckError::AlreadyConnected);
        }
        if self
            .table
            .as_ref()
            .is_some_and(|table| table.self_id() == node.id)
        {
            return Err(DialCheckError::IsSelf);
        }
        if let Some(netrestrict) = &self.netrestrict {
            let allowed = node
                .addr
                .is_some_and(|addr| netrestrict.contains(addr.ip()));
            if !allowed {
                return Err(DialCheckError::NotWhitelisted);
            }
        }
        if self.history.contains(&node.id) {
            return Err(DialCheckError::RecentlyDialed);
        }
        Ok(())
    }

    /// Fold a finished task back into the scheduler state.
    pub fn on_task_done(&mut self, task: Task, now: Instant) {
        match task {
            Task::Dial(task) => {
                let id = task.id();
                self.history.add(id, self.history_expiry(now));
                self.dialing.remove(&id);

                match &task.outcome {
                    Some(DialOutcome::Connected) => debug!(task = %task, "Dial succeeded"),
                    Some(DialOutcome::Failed(err)) => debug!(task = %task, %err, "Dial failed"),
                    None => {}
                }

                // Keep the resolve backoff (and a freshly resolved endpoint)
                // for the next attempt.
                if task.is_static() {
                    if let Some(entry) = self.static_nodes.get_mut(&id) {
                        entry.resolve = task.resolve;
                        if !task.dest.is_incomplete() {
                            entry.node = task.dest;
                        }
                    }
                }
            }
            Task::Discovery(task) => {
                debug!(results = task.results.len(), "Discovery lookup finished");
                self.lookup_running = false;
                self.lookup_buf.extend(task.results);
            }
            Task::Wait(_) => {}
        }
    }

    /// End of the suppression window for a dial finished at `now`.
    ///
    /// Windows too long to represent saturate at `MAX_CONFIG_INTERVAL`.
    fn history_expiry(&self, now: Instant) -> Instant {
        now.checked_add(self.config.dial_history_expiration)
            .unwrap_or_else(|| now + MAX_CONFIG_INTERVAL)
    }

    fn add_dial(
        &mut self,
        flags: ConnFlags,
        node: Node,
        peers: &ConnectedPeers,
        tasks: &mut Vec<Task>,
    ) -> bool {
        if let Err(err) = self.check_dial(&node, peers) {
            trace!(id = %node.id, addr = ?node.addr, %err, "Skipping dial candidate");
            return false;
        }
        self.dialing.insert(node.id, flags);
        let backoff = self.new_backoff();
        tasks.push(Task::Dial(DialTask::new(flags, node, backoff)));
        true
    }

    fn new_backoff(&self) -> ResolveBackoff {
        ResolveBackoff::new(
            self.config.initial_resolve_delay,
            self.config.max_resolve_delay,
        )
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Number of dials in flight.
    pub fn dialing_count(&self) -> usize {
        self.dialing.len()
    }

    pub fn is_dialing(&self, id: &NodeId) -> bool {
        self.dialing.contains_key(id)
    }

    pub fn history(&self) -> &DialHistory {
        &self.history
    }

    /// Unexpired dial history entries.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Candidates left over from earlier lookups.
    pub fn lookup_buffer_len(&self) -> usize {
        self.lookup_buf.len()
    }

    pub fn is_lookup_running(&self) -> bool {
        self.lookup_running
    }

    /// Bootnodes in their current rotation order.
    pub fn bootnodes(&self) -> impl Iterator<Item = &Node> {
        self.bootnodes.iter()
    }

    /// Configured static nodes, ordered by id.
    pub fn static_nodes(&self) -> impl Iterator<Item = &Node> {
        self.static_nodes.values().map(|entry| &entry.node)
    }
}
