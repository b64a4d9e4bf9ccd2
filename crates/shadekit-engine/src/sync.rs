//! Sync loop bookkeeping: mutation batching and scan scheduling.
//!
//! The engine is host-driven. `pump` drains mutation records into a
//! per-frame batch deduped by affected source; `tick` is the rendering
//! opportunity that works the batch off. Initial scans are chunked: the
//! node queue carries across ticks and each tick processes nodes until the
//! time budget runs out.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use shadekit_dom::NodeId;
use tracing::debug;

use crate::source::SourceId;

/// Where the loop is between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing to do.
    Idle,
    /// Work is queued for the next tick.
    Scheduled,
    /// A tick is applying a batch right now.
    Applying,
}

/// Per-tick time budget for scan and apply work.
pub(crate) const TICK_BUDGET: Duration = Duration::from_millis(6);

pub(crate) struct SyncLoop {
    state: SyncState,
    /// Nodes awaiting initial classification, in document order.
    scan_queue: VecDeque<NodeId>,
    /// Sources with observed changes, deduped. BTreeSet keeps application
    /// in registration order.
    dirty: BTreeSet<SourceId>,
    /// Nodes added since the last tick that may carry style.
    added: VecDeque<NodeId>,
}

impl SyncLoop {
    pub fn new() -> Self {
        Self {
            state: SyncState::Idle,
            scan_queue: VecDeque::new(),
            dirty: BTreeSet::new(),
            added: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Queue a full scan over `nodes`.
    pub fn schedule_scan(&mut self, nodes: Vec<NodeId>) {
        debug!(count = nodes.len(), "Initial scan scheduled");
        self.scan_queue = nodes.into();
        if !self.scan_queue.is_empty() {
            self.state = SyncState::Scheduled;
        }
    }

    /// Mark one source dirty; batches collapse repeat hits per source.
    pub fn mark_dirty(&mut self, source: SourceId) {
        self.dirty.insert(source);
        if self.state == SyncState::Idle {
            self.state = SyncState::Scheduled;
        }
    }

    /// Queue a freshly attached node for classification.
    pub fn mark_added(&mut self, node: NodeId) {
        self.added.push_back(node);
        if self.state == SyncState::Idle {
            self.state = SyncState::Scheduled;
        }
    }

    pub fn has_work(&self) -> bool {
        !self.scan_queue.is_empty() || !self.dirty.is_empty() || !self.added.is_empty()
    }

    /// Enter the applying phase for this tick.
    pub fn begin_apply(&mut self) {
        self.state = SyncState::Applying;
    }

    /// Leave the applying phase; back to Scheduled if work remains.
    pub fn end_apply(&mut self) {
        self.state = if self.has_work() {
            SyncState::Scheduled
        } else {
            SyncState::Idle
        };
    }

    pub fn next_scan_node(&mut self) -> Option<NodeId> {
        self.scan_queue.pop_front()
    }

    pub fn next_added_node(&mut self) -> Option<NodeId> {
        self.added.pop_front()
    }

    pub fn next_dirty_source(&mut self) -> Option<SourceId> {
        let first = *self.dirty.iter().next()?;
        self.dirty.remove(&first);
        Some(first)
    }

    /// Drop a source from the pending batch, if queued.
    pub fn forget_source(&mut self, source: SourceId) {
        self.dirty.remove(&source);
    }

    /// Discard everything in flight.
    pub fn cancel(&mut self) {
        let discarded =
            self.scan_queue.len() + self.dirty.len() + self.added.len();
        if discarded > 0 {
            debug!(discarded, "In-flight sync work discarded");
        }
        self.scan_queue.clear();
        self.dirty.clear();
        self.added.clear();
        self.state = SyncState::Idle;
    }
}
