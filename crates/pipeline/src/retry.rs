//! Bounded exponential backoff, shared by chunk transport and artifact
//! persistence.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The operation failed on every attempt; carries the last error.
    Exhausted { attempts: u32, error: E },
    /// The cancellation token fired while waiting to retry.
    Cancelled,
}

/// Retry policy with bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (not a retry count).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Calculates the delay following the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Runs `op` until it succeeds, the attempt budget is exhausted, or
    /// `cancel` fires during a backoff wait.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
                Err(error) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        // Capped from 8s.
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_runs_once() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<u32, RetryError<&str>> = fast_policy(3)
            .run(&cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;

        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_then_success() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<&str, RetryError<&str>> = fast_policy(3)
            .run(&cancel, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("flaky") } else { Ok("done") } }
            })
            .await;

        assert!(matches!(result, Ok("done")));
        // Two failures plus the success: attempts == failures + 1.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_error() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<(), RetryError<String>> = fast_policy(3)
            .run(&cancel, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, error }) => {
                assert_eq!(attempts, 3);
                assert_eq!(error, "failure 2");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_retrying() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), RetryError<&str>> = fast_policy(3)
            .run(&cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        // The first attempt still ran; the backoff wait observed the token.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
