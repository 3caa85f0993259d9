//! Shared types for the appshell workspace.
//!
//! This crate provides foundational types used across multiple crates in the
//! workspace, breaking circular dependency chains:
//! - [`ModuleId`](module_id::ModuleId) - normalized dotted module identifier
//! - [`Platform`](platform::Platform) - host platform detection
//! - [`LoadStats`] - load tracker counters and the quiescence predicate

pub mod module_id;
pub mod platform;

pub use module_id::ModuleId;
pub use platform::Platform;

use std::time::Duration;

/// Load outcome for a single requested module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Requested, fetch outstanding.
    Pending,
    /// Fetch completed successfully.
    Loaded,
    /// Fetch completed with an error. Distinct from success so diagnostics
    /// can report partial loads, but still counts as settled.
    Failed,
}

/// Counters kept by the load tracker.
///
/// Invariant: `completed + failed <= required` at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Modules requested at least once.
    pub required: u64,
    /// Modules whose fetch completed successfully.
    pub completed: u64,
    /// Modules whose fetch completed with an error.
    pub failed: u64,
}

impl LoadStats {
    /// Modules that reached a terminal state, successful or not.
    pub fn settled(&self) -> u64 {
        self.completed + self.failed
    }

    /// Quiescence: every requested module reached a terminal state.
    pub fn is_quiescent(&self) -> bool {
        self.settled() >= self.required
    }
}

/// Cadence of the readiness poll loop and the resize watcher.
pub const POLL_TICK_INTERVAL: Duration = Duration::from_millis(40);

/// Fixed retry budget for the readiness poller. Exceeding it triggers the
/// fail-open path: start with whatever loaded, after a diagnostic.
pub const POLL_RETRY_BUDGET: u64 = 100;
