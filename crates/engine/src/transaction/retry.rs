//! Per-step retry loop.

use tokio::time::sleep;

use super::{TransactionObserver, TransactionOptions, TransactionStep};

/// Run `step` until it succeeds or its retry budget is spent.
///
/// A non-retryable step gets exactly one attempt. The error from the final
/// attempt is returned.
pub(crate) async fn run_step_with_retry<T: 'static>(
    step: &TransactionStep<T>,
    options: &TransactionOptions,
    observer: &dyn TransactionObserver,
) -> anyhow::Result<T> {
    let retry_limit = step.retry_limit(options.max_retries);
    let retry_delay = options.retry_delay();
    let mut attempt = 0u32;

    loop {
        if attempt > 0 {
            sleep(retry_delay).await;
        }
        observer.step_started(&step.name, attempt);
        match (step.execute)().await {
            Ok(value) => {
                observer.step_succeeded(&step.name, attempt);
                return Ok(value);
            }
            Err(error) if attempt < retry_limit => {
                observer.step_attempt_failed(&step.name, attempt, &error, retry_delay);
                attempt += 1;
            }
            Err(error) => {
                observer.step_failed(&step.name, attempts_made(attempt), &error);
                return Err(error);
            }
        }
    }
}

/// Number of attempts made once `attempt` (zero-based) has finished.
fn attempts_made(attempt: u32) -> u32 {
    attempt.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;
    use crate::transaction::NoopObserver;

    fn flaky_step(failures_before_success: u32, calls: Arc<AtomicU32>) -> TransactionStep<u32> {
        TransactionStep::new("flaky", move || {
            let calls = Arc::clone(&calls);
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if call < failures_before_success {
                    anyhow::bail!("attempt {call} failed");
                }
                Ok(call)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_step_recovers_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let step = flaky_step(2, Arc::clone(&calls)).retryable(true);
        let value = run_step_with_retry(&step, &TransactionOptions::default(), &NoopObserver).await.unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_step_fails_on_first_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let step = flaky_step(1, Arc::clone(&calls));
        let error = run_step_with_retry(&step, &TransactionOptions::default(), &NoopObserver).await.unwrap_err();
        assert_eq!(error.to_string(), "attempt 0 failed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn final_attempt_error_is_returned() {
        let calls = Arc::new(AtomicU32::new(0));
        let step = flaky_step(10, Arc::clone(&calls)).max_retries(1);
        let error = run_step_with_retry(&step, &TransactionOptions::default(), &NoopObserver).await.unwrap_err();
        assert_eq!(error.to_string(), "attempt 1 failed");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn attempt_count_saturates_at_the_largest_budget() {
        assert_eq!(attempts_made(0), 1);
        assert_eq!(attempts_made(u32::MAX), u32::MAX);
    }
}
