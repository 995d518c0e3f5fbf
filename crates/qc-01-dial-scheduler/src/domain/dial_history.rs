//! # Dial History
//!
//! Short-term memory of recent dial attempts, used to avoid re-dialing a node
//! immediately after an attempt finished.
//!
//! Entries live in a binary min-heap keyed by expiry: `add` is O(log n),
//! `expire` pops k expired entries in O(k log n). `contains` is a linear scan,
//! which is fine because the history only ever holds the last expiration
//! window's worth of dials. Callers expire before querying.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

use super::entities::NodeId;

/// A single past dial and the instant its suppression ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PastDial {
    pub id: NodeId,
    pub expiry: Instant,
}

impl Ord for PastDial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expiry
            .cmp(&other.expiry)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for PastDial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Expiry-ordered record of recently dialed nodes.
#[derive(Debug, Clone, Default)]
pub struct DialHistory {
    heap: BinaryHeap<Reverse<PastDial>>,
}

impl DialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dial of `id` that suppresses re-dialing until `expiry`.
    pub fn add(&mut self, id: NodeId, expiry: Instant) {
        self.heap.push(Reverse(PastDial { id, expiry }));
    }

    /// Drop every entry whose expiry is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(Reverse(min)) = self.heap.peek() {
            if min.expiry > now {
                break;
            }
            self.heap.pop();
            removed += 1;
        }
        removed
    }

    /// Whether `id` has any entry left in the history.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.heap.iter().any(|Reverse(entry)| entry.id == *id)
    }

    /// The entry that expires soonest.
    pub fn min(&self) -> Option<&PastDial> {
        self.heap.peek().map(|Reverse(entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
