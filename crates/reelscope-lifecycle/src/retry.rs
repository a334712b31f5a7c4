//! Retry with exponential backoff for rate-limited service calls.
//!
//! Only [`ServiceError::RateLimited`] is retried. Every other failure is
//! returned on the attempt that produced it, without sleeping.

use std::future::Future;

use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{RetryError, ServiceResult};
use crate::metrics::record_retry;
use crate::progress::ProgressSender;

/// Wraps remote calls in a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingInvoker {
    policy: RetryPolicy,
}

impl RetryingInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    ///
    /// The wait before retry `n` is `initial_delay * 2^(n-1)` (capped by
    /// `max_delay`), or the server's retry-after hint when that is longer.
    ///
    /// # Example
    /// ```ignore
    /// let invoker = RetryingInvoker::new(RetryPolicy::new("inference", 4, Duration::from_secs(2)));
    /// let output = invoker.invoke(&progress, || service.run_inference(&request)).await?;
    /// ```
    pub async fn invoke<F, Fut, T>(
        &self,
        progress: &ProgressSender,
        operation: F,
    ) -> Result<T, RetryError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let op = self.policy.operation.as_str();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = op, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_rate_limited() => {
                    debug!(operation = op, attempt, error = %e, "Non-retryable failure");
                    return Err(RetryError::Permanent(e));
                }
                Err(e) if attempt >= self.policy.max_attempts => {
                    warn!(
                        operation = op,
                        attempts = attempt,
                        "Retry budget exhausted: {}",
                        e
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let backoff = self.policy.delay_for_retry(attempt);
                    let delay = match e.retry_after() {
                        Some(hint) if hint > backoff => hint,
                        _ => backoff,
                    };

                    warn!(
                        operation = op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying: {}",
                        e
                    );
                    record_retry(op);
                    progress.retry_scheduled(op, attempt, delay);

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use reelscope_models::LifecyclePhase;
    use tokio::time::Instant;

    use crate::error::ServiceError;

    fn invoker(max_attempts: u32) -> RetryingInvoker {
        RetryingInvoker::new(RetryPolicy::new("test", max_attempts, Duration::from_secs(1)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_rate_limits_doubles_delay() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = invoker(5)
            .invoke(&ProgressSender::noop(), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(ServiceError::rate_limited("quota"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_returns_without_sleeping() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = invoker(5)
            .invoke(&ProgressSender::noop(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Server(503, "unavailable".into()))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Permanent(ServiceError::Server(503, _)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = invoker(3)
            .invoke(&ProgressSender::noop(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::rate_limited("quota"))
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.is_rate_limited());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // No sleep after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_sleeps() {
        let start = Instant::now();
        let result: Result<(), _> = invoker(1)
            .invoke(&ProgressSender::noop(), || async {
                Err(ServiceError::rate_limited("quota"))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longer_retry_after_hint_wins() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = invoker(3)
            .invoke(&ProgressSender::noop(), || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ServiceError::rate_limited_for("quota", Duration::from_secs(30)))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_events_emitted() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress = ProgressSender::from_fn(move |e| sink.lock().unwrap().push(e.phase));

        let calls = AtomicU32::new(0);
        let _ = invoker(3)
            .invoke(&progress, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ServiceError::rate_limited("quota"))
                } else {
                    Ok(())
                }
            })
            .await;

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                LifecyclePhase::RetryScheduled {
                    operation: "test".into(),
                    attempt: 1,
                    delay_ms: 1000,
                },
                LifecyclePhase::RetryScheduled {
                    operation: "test".into(),
                    attempt: 2,
                    delay_ms: 2000,
                },
            ]
        );
    }
}
