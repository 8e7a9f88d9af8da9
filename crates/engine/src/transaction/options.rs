//! Transaction options, lifecycle state and results.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toolsmith_types::{ErrorContext, ErrorKind, OperationError};

/// Default number of retries for retryable steps.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default pause between attempts of a retryable step.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Execution policy for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionOptions {
    /// Stop at the first step that fails terminally.
    pub stop_on_error: bool,
    /// Compensate completed steps when the transaction fails.
    pub rollback_on_error: bool,
    /// Retries for retryable steps that do not set their own limit.
    pub max_retries: u32,
    /// Pause before each retry, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            stop_on_error: true,
            rollback_on_error: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl TransactionOptions {
    /// Pause before each retry.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Lifecycle of a transaction instance.
///
/// `Pending` is the only state in which steps can be added or the transaction
/// executed; every other state marks the instance as spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransactionState {
    /// Accepting steps.
    Pending,
    /// Executing the step at `step_index`.
    Running { step_index: usize },
    /// Compensating completed steps.
    RollingBack,
    /// Every step succeeded.
    Committed,
    /// At least one step failed and no compensation was performed.
    Failed,
    /// At least one step failed and completed steps were compensated.
    RolledBack,
}

impl TransactionState {
    /// Whether the instance has already been executed.
    pub fn is_spent(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Outcome of a transaction run.
///
/// `results` preserves completion order. Step failures and compensation
/// failures are kept separately so a failed rollback is visible to callers.
#[derive(Debug)]
pub struct TransactionResult<T> {
    /// True when no step failed.
    pub success: bool,
    /// Step name to result, in completion order.
    pub results: IndexMap<String, T>,
    /// Step name to the error from its final attempt.
    pub errors: IndexMap<String, anyhow::Error>,
    /// True once a compensation pass ran against at least one completed step.
    pub rolled_back: bool,
    /// Step name to the error its rollback raised.
    pub rollback_errors: IndexMap<String, anyhow::Error>,
}

impl<T> TransactionResult<T> {
    /// Names of the steps that completed, in completion order.
    pub fn completed_steps(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// Names of the steps that failed.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    /// Build the transaction-failed error a tool handler reports to its caller.
    ///
    /// The context lists completed and failed steps, whether compensation ran,
    /// and any rollback failures. `context` supplies the tool/action fields.
    pub fn to_operation_error(&self, context: ErrorContext) -> OperationError {
        let failures: IndexMap<&str, String> = self.errors.iter().map(|(name, error)| (name.as_str(), format!("{error:#}"))).collect();
        let summary = failures
            .iter()
            .map(|(name, message)| format!("{name}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        let message = if summary.is_empty() {
            "Transaction failed".to_string()
        } else {
            format!("Transaction failed at {summary}")
        };

        let mut context = context
            .with("completedSteps", self.completed_steps())
            .with("failedSteps", &failures)
            .with("rolledBack", self.rolled_back);
        if !self.rollback_errors.is_empty() {
            let rollback_failures: IndexMap<&str, String> = self
                .rollback_errors
                .iter()
                .map(|(name, error)| (name.as_str(), format!("{error:#}")))
                .collect();
            context = context.with("rollbackFailures", rollback_failures);
        }
        for name in self.results.keys().chain(self.errors.keys()) {
            context = context.with_related_resource(name.clone());
        }

        OperationError::new(ErrorKind::TransactionFailed, message).with_context(context)
    }
}
