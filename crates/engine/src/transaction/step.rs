//! Named units of work with an optional compensating action.

use std::{fmt, future::Future};

use anyhow::Result;
use futures_util::future::BoxFuture;

type ExecuteFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;
type RollbackFn<T> = Box<dyn Fn(T) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One step of a [`Transaction`](super::Transaction).
///
/// `execute` is a factory rather than a single future so a retryable step can
/// be attempted more than once. Values produced by earlier steps are usually
/// shared with later ones through captured `Arc` cells.
pub struct TransactionStep<T> {
    pub(crate) name: String,
    pub(crate) execute: ExecuteFn<T>,
    pub(crate) rollback: Option<RollbackFn<T>>,
    pub(crate) retryable: bool,
    pub(crate) max_retries: Option<u32>,
}

impl<T: 'static> TransactionStep<T> {
    /// Create a non-retryable step without a rollback.
    pub fn new<F, Fut>(name: impl Into<String>, execute: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            execute: Box::new(move || Box::pin(execute())),
            rollback: None,
            retryable: false,
            max_retries: None,
        }
    }

    /// Attach the compensating action. It receives the value `execute` produced.
    pub fn with_rollback<F, Fut>(mut self, rollback: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.rollback = Some(Box::new(move |value| Box::pin(rollback(value))));
        self
    }

    /// Allow the step to be retried after a failed attempt.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Override the transaction's retry limit for this step. Implies `retryable(true)`.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retryable = true;
        self.max_retries = Some(max_retries);
        self
    }
}

impl<T> TransactionStep<T> {
    /// Step name, unique within its transaction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a compensating action is defined.
    pub fn has_rollback(&self) -> bool {
        self.rollback.is_some()
    }

    /// Whether failed attempts are retried.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Retries allowed for this step given the transaction default.
    pub(crate) fn retry_limit(&self, transaction_default: u32) -> u32 {
        if self.retryable {
            self.max_retries.unwrap_or(transaction_default)
        } else {
            0
        }
    }
}

impl<T> fmt::Debug for TransactionStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStep")
            .field("name", &self.name)
            .field("has_rollback", &self.rollback.is_some())
            .field("retryable", &self.retryable)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
