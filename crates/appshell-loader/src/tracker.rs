//! Load tracker: requested-module bookkeeping and quiescence.
//!
//! Thread-safe via an internal lock, shared by `Arc` between the loader's
//! fetch tasks and the readiness poller. Only fetch completion callbacks may
//! mark completion; failure is a distinct completed-with-error state so that
//! a known-bad fetch settles the tracker instead of burning the poll budget.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::warn;

use appshell_types::{LoadStats, LoadStatus, ModuleId};

/// Records the status of every requested module and the settled counts.
#[derive(Debug, Default)]
pub struct LoadTracker {
    inner: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    statuses: HashMap<ModuleId, LoadStatus>,
    stats: LoadStats,
}

impl TrackerState {
    /// Move a pending module to a terminal status. Marks for modules that
    /// were never requested, or already settled, are bookkeeping bugs; they
    /// are logged and dropped rather than corrupting the counters.
    fn settle(&mut self, id: &ModuleId, status: LoadStatus) -> bool {
        match self.statuses.get_mut(id) {
            Some(current @ LoadStatus::Pending) => {
                *current = status;
                true
            }
            Some(_) => {
                warn!(module = %id, "module settled twice; ignoring");
                false
            }
            None => {
                warn!(module = %id, "settling a module that was never requested; ignoring");
                false
            }
        }
    }
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module request. Returns `true` only the first time a given
    /// id is requested; duplicates are no-ops. This is the idempotency
    /// guarantee preventing double fetches when several modules declare the
    /// same dependency.
    pub fn request_once(&self, id: &ModuleId) -> bool {
        let mut inner = self.inner.lock();
        if inner.statuses.contains_key(id) {
            return false;
        }
        inner.statuses.insert(id.clone(), LoadStatus::Pending);
        inner.stats.required += 1;
        true
    }

    /// Record a successful fetch completion.
    pub fn mark_completed(&self, id: &ModuleId) {
        let mut inner = self.inner.lock();
        if inner.settle(id, LoadStatus::Loaded) {
            inner.stats.completed += 1;
        }
    }

    /// Record a fetch that finished with an error.
    pub fn mark_failed(&self, id: &ModuleId) {
        let mut inner = self.inner.lock();
        if inner.settle(id, LoadStatus::Failed) {
            inner.stats.failed += 1;
        }
    }

    pub fn status(&self, id: &ModuleId) -> Option<LoadStatus> {
        self.inner.lock().statuses.get(id).copied()
    }

    pub fn stats(&self) -> LoadStats {
        self.inner.lock().stats
    }

    /// Quiescence: every requested module reached a terminal state.
    pub fn is_quiescent(&self) -> bool {
        self.stats().is_quiescent()
    }
}
