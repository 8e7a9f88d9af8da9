//! Saga-style transactions: ordered steps with per-step retry and
//! reverse-order compensation.
//!
//! - Steps run strictly one after another; each `execute` future is awaited
//!   before the next step starts
//! - A failed step stops the run (unless `stop_on_error` is off) and, when
//!   `rollback_on_error` is set, the rollbacks of completed steps run newest
//!   first
//! - A failing rollback is recorded and compensation carries on with the
//!   remaining steps
//! - The engine reports failures through [`TransactionResult`]; it never turns
//!   them into an [`OperationError`] on its own
//!
//! There is no isolation between transactions touching the same resource and
//! no cancellation: a step that never completes blocks its transaction.

mod observer;
mod options;
mod retry;
mod step;

use std::sync::Arc;

use indexmap::IndexMap;
use toolsmith_types::{ErrorContext, ErrorKind, OperationError};

pub use observer::{NoopObserver, TracingObserver, TransactionObserver};
pub use options::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, TransactionOptions, TransactionResult, TransactionState};
pub use step::TransactionStep;

use retry::run_step_with_retry;

/// An ordered list of steps executed once as a best-effort atomic unit.
///
/// ```
/// use toolsmith_engine::{Transaction, TransactionOptions, TransactionStep};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let mut transaction = Transaction::new(TransactionOptions::default());
/// transaction
///     .add_step(TransactionStep::new("create", || async { anyhow::Ok(1) }))?
///     .add_step(TransactionStep::new("attach", || async { anyhow::Ok(2) }))?;
/// let result = transaction.execute().await?;
/// assert!(result.success);
/// assert_eq!(result.completed_steps(), vec!["create", "attach"]);
/// # Ok::<(), toolsmith_types::OperationError>(())
/// # }).unwrap();
/// ```
pub struct Transaction<T> {
    steps: Vec<TransactionStep<T>>,
    options: TransactionOptions,
    observer: Arc<dyn TransactionObserver>,
    state: TransactionState,
}

impl<T> Transaction<T>
where
    T: Clone + Send + 'static,
{
    /// Create an empty transaction that reports to [`TracingObserver`].
    pub fn new(options: TransactionOptions) -> Self {
        Self {
            steps: Vec::new(),
            options,
            observer: Arc::new(TracingObserver),
            state: TransactionState::Pending,
        }
    }

    /// Replace the lifecycle observer.
    pub fn with_observer(mut self, observer: Arc<dyn TransactionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Append a step.
    ///
    /// Fails with `AlreadyExists` when the name is taken and with
    /// `InvalidState` once the transaction has been executed.
    pub fn add_step(&mut self, step: TransactionStep<T>) -> Result<&mut Self, OperationError> {
        if self.state.is_spent() {
            return Err(spent_error(self.state, "add_step"));
        }
        if self.steps.iter().any(|existing| existing.name == step.name) {
            return Err(OperationError::new(
                ErrorKind::AlreadyExists,
                format!("Transaction already has a step named '{}'", step.name),
            )
            .with_context(ErrorContext::default().with_parameter("name", &step.name)));
        }
        self.steps.push(step);
        Ok(self)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Execution options.
    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    /// Step names in declaration order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(TransactionStep::name).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps were added.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step once.
    ///
    /// Step failures are reported in the returned [`TransactionResult`]. The
    /// only error is `InvalidState`, returned when the transaction was
    /// already executed.
    pub async fn execute(&mut self) -> Result<TransactionResult<T>, OperationError> {
        if self.state.is_spent() {
            return Err(spent_error(self.state, "execute"));
        }

        let observer = Arc::clone(&self.observer);
        observer.transaction_started(self.steps.len());

        let mut results = IndexMap::new();
        let mut errors = IndexMap::new();
        let mut ledger: Vec<(usize, T)> = Vec::new();
        let mut compensation: Option<Compensation> = None;

        for (step_index, step) in self.steps.iter().enumerate() {
            self.state = TransactionState::Running { step_index };
            match run_step_with_retry(step, &self.options, observer.as_ref()).await {
                Ok(value) => {
                    ledger.push((step_index, value.clone()));
                    results.insert(step.name.clone(), value);
                }
                Err(error) => {
                    errors.insert(step.name.clone(), error);
                    if self.options.stop_on_error {
                        if self.options.rollback_on_error && compensation.is_none() {
                            self.state = TransactionState::RollingBack;
                            compensation = Some(compensate(&self.steps, std::mem::take(&mut ledger), observer.as_ref()).await);
                        }
                        break;
                    }
                }
            }
        }

        let success = errors.is_empty();
        if !success && self.options.rollback_on_error && compensation.is_none() {
            self.state = TransactionState::RollingBack;
            compensation = Some(compensate(&self.steps, std::mem::take(&mut ledger), observer.as_ref()).await);
        }

        let Compensation { attempted, failures } = compensation.unwrap_or_default();
        self.state = if success {
            TransactionState::Committed
        } else if attempted {
            TransactionState::RolledBack
        } else {
            TransactionState::Failed
        };
        observer.transaction_finished(success, attempted);

        Ok(TransactionResult {
            success,
            results,
            errors,
            rolled_back: attempted,
            rollback_errors: failures,
        })
    }
}

/// Build a transaction from `steps`, run it once and return the result.
pub async fn execute_transaction<T>(steps: Vec<TransactionStep<T>>, options: TransactionOptions) -> Result<TransactionResult<T>, OperationError>
where
    T: Clone + Send + 'static,
{
    let mut transaction = Transaction::new(options);
    for step in steps {
        transaction.add_step(step)?;
    }
    transaction.execute().await
}

#[derive(Default)]
struct Compensation {
    attempted: bool,
    failures: IndexMap<String, anyhow::Error>,
}

/// Roll back completed steps newest first. Steps without a rollback are skipped.
async fn compensate<T: 'static>(steps: &[TransactionStep<T>], ledger: Vec<(usize, T)>, observer: &dyn TransactionObserver) -> Compensation {
    if ledger.is_empty() {
        return Compensation::default();
    }

    observer.rollback_started(ledger.len());
    let mut failures = IndexMap::new();
    for (step_index, value) in ledger.into_iter().rev() {
        let step = &steps[step_index];
        let Some(rollback) = &step.rollback else {
            observer.rollback_skipped(&step.name);
            continue;
        };
        match rollback(value).await {
            Ok(()) => observer.step_rolled_back(&step.name),
            Err(error) => {
                observer.rollback_failed(&step.name, &error);
                failures.insert(step.name.clone(), error);
            }
        }
    }

    Compensation { attempted: true, failures }
}

fn spent_error(state: TransactionState, operation: &str) -> OperationError {
    OperationError::new(ErrorKind::InvalidState, format!("Transaction has already been executed; {operation} is not allowed"))
        .with_context(ErrorContext::default().with_action(operation).with("state", state))
        .with_suggestion("Create a new transaction for each run.")
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    use anyhow::anyhow;
    use tokio::time::Instant;

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn ok_step(name: &str, value: u32, log: &Log) -> TransactionStep<u32> {
        let executed = Arc::clone(log);
        let rolled_back = Arc::clone(log);
        let exec_name = name.to_string();
        let rollback_name = name.to_string();
        TransactionStep::new(name, move || {
            let log = Arc::clone(&executed);
            let name = exec_name.clone();
            async move {
                log.lock().unwrap().push(format!("exec:{name}"));
                anyhow::Ok(value)
            }
        })
        .with_rollback(move |result| {
            let log = Arc::clone(&rolled_back);
            let name = rollback_name.clone();
            async move {
                log.lock().unwrap().push(format!("rollback:{name}({result})"));
                anyhow::Ok(())
            }
        })
    }

    fn failing_step(name: &str, calls: &Arc<AtomicU32>) -> TransactionStep<u32> {
        let calls = Arc::clone(calls);
        let message = format!("{name} exploded");
        TransactionStep::new(name, move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let message = message.clone();
            async move { Err(anyhow!(message)) }
        })
    }

    fn quiet(options: TransactionOptions) -> Transaction<u32> {
        Transaction::new(options).with_observer(Arc::new(NoopObserver))
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl TransactionObserver for RecordingObserver {
        fn step_attempt_failed(&self, step: &str, attempt: u32, _error: &anyhow::Error, retry_in: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("retry:{step}:{attempt}:{}", retry_in.as_millis()));
        }

        fn rollback_failed(&self, step: &str, _error: &anyhow::Error) {
            self.events.lock().unwrap().push(format!("rollback_failed:{step}"));
        }

        fn transaction_finished(&self, success: bool, rolled_back: bool) {
            self.events.lock().unwrap().push(format!("finished:{success}:{rolled_back}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn all_steps_commit_in_order() {
        let log = Log::default();
        let mut transaction = quiet(TransactionOptions::default());
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(ok_step("b", 2, &log))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(result.success);
        assert!(!result.rolled_back);
        assert_eq!(result.results.iter().map(|(name, value)| (name.as_str(), *value)).collect::<Vec<_>>(), vec![("a", 1), ("b", 2)]);
        assert_eq!(*log.lock().unwrap(), vec!["exec:a", "exec:b"]);
        assert_eq!(transaction.state(), TransactionState::Committed);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_failure_stops_run_and_rolls_back_completed_steps() {
        let log = Log::default();
        let b_calls = Arc::new(AtomicU32::new(0));
        let c_log = Log::default();
        let observer = Arc::new(RecordingObserver::default());
        let mut transaction = Transaction::new(TransactionOptions::default()).with_observer(observer.clone());
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(failing_step("b", &b_calls).max_retries(2))
            .unwrap()
            .add_step(ok_step("c", 3, &c_log))
            .unwrap();

        let started = Instant::now();
        let result = transaction.execute().await.unwrap();

        assert!(!result.success);
        assert_eq!(b_calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(200) && waited < Duration::from_millis(300), "waited {waited:?}");
        assert!(c_log.lock().unwrap().is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["exec:a", "rollback:a(1)"]);
        assert!(result.rolled_back);
        assert_eq!(result.failed_steps(), vec!["b"]);
        assert_eq!(result.errors["b"].to_string(), "b exploded");
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["retry:b:0:100", "retry:b:1:100", "finished:false:true"]
        );
        assert_eq!(transaction.state(), TransactionState::RolledBack);
    }

    #[tokio::test(start_paused = true)]
    async fn rollbacks_run_in_reverse_completion_order() {
        let log = Log::default();
        let calls = Arc::new(AtomicU32::new(0));
        let mut transaction = quiet(TransactionOptions::default());
        transaction
            .add_step(ok_step("a", 10, &log))
            .unwrap()
            .add_step(ok_step("b", 20, &log))
            .unwrap()
            .add_step(failing_step("c", &calls))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(result.rolled_back);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock().unwrap(), vec!["exec:a", "exec:b", "rollback:b(20)", "rollback:a(10)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_on_error_collects_every_failure() {
        let log = Log::default();
        let calls = Arc::new(AtomicU32::new(0));
        let mut transaction = quiet(TransactionOptions {
            stop_on_error: false,
            rollback_on_error: false,
            ..Default::default()
        });
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(failing_step("b", &calls))
            .unwrap()
            .add_step(ok_step("c", 3, &log))
            .unwrap()
            .add_step(failing_step("d", &calls))
            .unwrap()
            .add_step(ok_step("e", 5, &log))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.failed_steps(), vec!["b", "d"]);
        assert_eq!(result.completed_steps(), vec!["a", "c", "e"]);
        assert!(!result.rolled_back);
        assert_eq!(transaction.state(), TransactionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_on_error_rolls_back_after_the_loop() {
        let log = Log::default();
        let calls = Arc::new(AtomicU32::new(0));
        let mut transaction = quiet(TransactionOptions {
            stop_on_error: false,
            ..Default::default()
        });
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(failing_step("b", &calls))
            .unwrap()
            .add_step(ok_step("c", 3, &log))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(result.rolled_back);
        assert_eq!(*log.lock().unwrap(), vec!["exec:a", "exec:c", "rollback:c(3)", "rollback:a(1)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_rollback_does_not_halt_compensation() {
        let log = Log::default();
        let calls = Arc::new(AtomicU32::new(0));
        let observer = Arc::new(RecordingObserver::default());
        let broken = TransactionStep::new("b", || async { anyhow::Ok(2) }).with_rollback(|_| async { Err(anyhow!("cannot undo b")) });
        let mut transaction = Transaction::new(TransactionOptions::default()).with_observer(observer.clone());
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(broken)
            .unwrap()
            .add_step(failing_step("c", &calls))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(result.rolled_back);
        assert_eq!(*log.lock().unwrap(), vec!["exec:a", "rollback:a(1)"]);
        assert_eq!(result.rollback_errors.len(), 1);
        assert_eq!(result.rollback_errors["b"].to_string(), "cannot undo b");
        assert!(observer.events.lock().unwrap().contains(&"rollback_failed:b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn steps_without_rollback_are_skipped() {
        let log = Log::default();
        let calls = Arc::new(AtomicU32::new(0));
        let plain = TransactionStep::new("plain", || async { anyhow::Ok(7) });
        let mut transaction = quiet(TransactionOptions::default());
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(plain)
            .unwrap()
            .add_step(failing_step("c", &calls))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(result.rolled_back);
        assert!(result.rollback_errors.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["exec:a", "rollback:a(1)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_completed_means_nothing_rolled_back() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut transaction = quiet(TransactionOptions::default());
        transaction.add_step(failing_step("only", &calls)).unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(!result.success);
        assert!(!result.rolled_back);
        assert_eq!(transaction.state(), TransactionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_disabled_leaves_completed_steps() {
        let log = Log::default();
        let calls = Arc::new(AtomicU32::new(0));
        let mut transaction = quiet(TransactionOptions {
            rollback_on_error: false,
            ..Default::default()
        });
        transaction
            .add_step(ok_step("a", 1, &log))
            .unwrap()
            .add_step(failing_step("b", &calls))
            .unwrap();

        let result = transaction.execute().await.unwrap();
        assert!(!result.rolled_back);
        assert_eq!(*log.lock().unwrap(), vec!["exec:a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn spent_transaction_rejects_reuse() {
        let log = Log::default();
        let mut transaction = quiet(TransactionOptions::default());
        transaction.add_step(ok_step("a", 1, &log)).unwrap();
        transaction.execute().await.unwrap();

        let rerun = transaction.execute().await.err().unwrap();
        assert_eq!(rerun.kind(), ErrorKind::InvalidState);

        let late_step = transaction.add_step(ok_step("b", 2, &log)).err().unwrap();
        assert_eq!(late_step.kind(), ErrorKind::InvalidState);
        assert_eq!(*log.lock().unwrap(), vec!["exec:a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_step_names_are_rejected() {
        let log = Log::default();
        let mut transaction = quiet(TransactionOptions::default());
        transaction.add_step(ok_step("a", 1, &log)).unwrap();
        let duplicate = transaction.add_step(ok_step("a", 2, &log)).err().unwrap();
        assert_eq!(duplicate.kind(), ErrorKind::AlreadyExists);
        assert_eq!(transaction.step_names(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn later_steps_see_values_from_earlier_steps() {
        let ticket_id = Arc::new(Mutex::new(None::<u32>));
        let producer = {
            let ticket_id = Arc::clone(&ticket_id);
            TransactionStep::new("create-ticket", move || {
                let ticket_id = Arc::clone(&ticket_id);
                async move {
                    *ticket_id.lock().unwrap() = Some(41);
                    anyhow::Ok(41)
                }
            })
        };
        let consumer = {
            let ticket_id = Arc::clone(&ticket_id);
            TransactionStep::new("create-task", move || {
                let ticket_id = *ticket_id.lock().unwrap();
                async move { ticket_id.map(|id| id + 1).ok_or_else(|| anyhow!("ticket id missing")) }
            })
        };

        let result = execute_transaction(vec![producer, consumer], TransactionOptions::default()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.results["create-task"], 42);
    }
}
