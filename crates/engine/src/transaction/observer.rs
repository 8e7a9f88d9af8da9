//! Step lifecycle hooks.
//!
//! The engine reports progress through an injected [`TransactionObserver`]
//! instead of writing to a global sink. [`TracingObserver`] is the default and
//! forwards every hook to `tracing`.

use std::time::Duration;

use tracing::{debug, info, warn};

/// Receives lifecycle events while a transaction runs. Every hook defaults to a no-op.
pub trait TransactionObserver: Send + Sync {
    /// Execution is starting.
    fn transaction_started(&self, _step_count: usize) {}

    /// An attempt of `step` is starting; `attempt` counts from zero.
    fn step_started(&self, _step: &str, _attempt: u32) {}

    /// `step` produced a value.
    fn step_succeeded(&self, _step: &str, _attempt: u32) {}

    /// An attempt failed and another one follows after `retry_in`.
    fn step_attempt_failed(&self, _step: &str, _attempt: u32, _error: &anyhow::Error, _retry_in: Duration) {}

    /// `step` failed terminally after `attempts` attempts.
    fn step_failed(&self, _step: &str, _attempts: u32, _error: &anyhow::Error) {}

    /// Compensation is starting for `completed` steps.
    fn rollback_started(&self, _completed: usize) {}

    /// `step` has no rollback and was left as is.
    fn rollback_skipped(&self, _step: &str) {}

    /// The rollback of `step` finished.
    fn step_rolled_back(&self, _step: &str) {}

    /// The rollback of `step` failed; compensation continues.
    fn rollback_failed(&self, _step: &str, _error: &anyhow::Error) {}

    /// Execution finished.
    fn transaction_finished(&self, _success: bool, _rolled_back: bool) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransactionObserver for NoopObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TransactionObserver for TracingObserver {
    fn transaction_started(&self, step_count: usize) {
        debug!(step_count, "transaction started");
    }

    fn step_started(&self, step: &str, attempt: u32) {
        debug!(step = %step, attempt, "transaction step started");
    }

    fn step_succeeded(&self, step: &str, attempt: u32) {
        debug!(step = %step, attempt, "transaction step succeeded");
    }

    fn step_attempt_failed(&self, step: &str, attempt: u32, error: &anyhow::Error, retry_in: Duration) {
        warn!(
            step = %step,
            attempt,
            retry_in_ms = retry_in.as_millis() as u64,
            error = %format!("{error:#}"),
            "transaction step attempt failed; retrying"
        );
    }

    fn step_failed(&self, step: &str, attempts: u32, error: &anyhow::Error) {
        warn!(step = %step, attempts, error = %format!("{error:#}"), "transaction step failed");
    }

    fn rollback_started(&self, completed: usize) {
        info!(completed, "rolling back completed transaction steps");
    }

    fn rollback_skipped(&self, step: &str) {
        debug!(step = %step, "transaction step has no rollback");
    }

    fn step_rolled_back(&self, step: &str) {
        info!(step = %step, "transaction step rolled back");
    }

    fn rollback_failed(&self, step: &str, error: &anyhow::Error) {
        warn!(step = %step, error = %format!("{error:#}"), "transaction step rollback failed");
    }

    fn transaction_finished(&self, success: bool, rolled_back: bool) {
        if success {
            debug!("transaction committed");
        } else {
            warn!(rolled_back, "transaction failed");
        }
    }
}
