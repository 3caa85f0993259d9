//! Readiness poller: the bounded-retry bootstrap gate.
//!
//! Every tick checks two conditions: the host container reported ready, and
//! the load tracker is quiescent. When both hold the bootstrap proceeds.
//! When the fixed retry budget runs out first, the poller fails open: it
//! reports ready anyway so the application starts with whatever modules did
//! load, after a diagnostic with the completion counts. A missing optional
//! module must not block startup.

use tracing::warn;

use appshell_types::POLL_RETRY_BUDGET;

use crate::bootstrap::BootstrapCtx;

/// Outcome of one poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Conditions not met; re-arm the timer.
    Waiting,
    /// Proceed to the drain-and-construct phase. `timed_out` marks the
    /// fail-open path.
    Ready { timed_out: bool },
}

/// Tick-driven readiness state machine. Owned by the orchestrator; only it
/// transitions poll state.
#[derive(Debug, Default)]
pub struct ReadinessPoller {
    tick_count: u64,
    app_name: Option<String>,
}

impl ReadinessPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the application name and restart the tick counter. A new
    /// name always restarts the budget.
    pub fn begin(&mut self, app_name: &str) {
        self.app_name = Some(app_name.to_string());
        self.tick_count = 0;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Run one poll check against the bootstrap context.
    pub fn tick(&mut self, ctx: &BootstrapCtx) -> PollOutcome {
        self.tick_count += 1;

        if ctx.device_ready() && ctx.tracker().is_quiescent() {
            return PollOutcome::Ready { timed_out: false };
        }

        if self.tick_count > POLL_RETRY_BUDGET {
            let stats = ctx.tracker().stats();
            warn!(
                app = self.app_name.as_deref().unwrap_or("<unnamed>"),
                completed = stats.completed,
                failed = stats.failed,
                required = stats.required,
                device_ready = ctx.device_ready(),
                "load budget exhausted; starting with partial module graph"
            );
            return PollOutcome::Ready { timed_out: true };
        }

        PollOutcome::Waiting
    }
}
