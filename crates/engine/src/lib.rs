//! # Toolsmith Engine
//!
//! Runs multi-step, side-effecting tool operations as saga-style
//! transactions. Each step is a named async action with an optional
//! compensating rollback; failed steps can be retried and completed steps are
//! rolled back newest first when the transaction fails.
//!
//! ## Usage
//!
//! ```rust
//! use toolsmith_engine::{TransactionOptions, TransactionStep, execute_transaction};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let steps = vec![
//!     TransactionStep::new("create-ticket", || async { anyhow::Ok("ticket-1".to_string()) })
//!         .with_rollback(|ticket_id| async move {
//!             println!("deleting {ticket_id}");
//!             anyhow::Ok(())
//!         }),
//!     TransactionStep::new("create-task", || async { anyhow::bail!("task store offline") }),
//! ];
//!
//! let result = execute_transaction(steps, TransactionOptions::default()).await?;
//! assert!(!result.success);
//! assert!(result.rolled_back);
//! # Ok::<(), toolsmith_types::OperationError>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`transaction`**: steps, options, results, the retry loop, compensation
//!   and the [`TransactionObserver`] hooks used for logging

pub mod transaction;

pub use transaction::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, NoopObserver, TracingObserver, Transaction, TransactionObserver, TransactionOptions,
    TransactionResult, TransactionState, TransactionStep, execute_transaction,
};
