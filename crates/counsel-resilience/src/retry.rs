//! Retry policy with exponential backoff.
//!
//! Operates on [`CallOutcome`]: success and terminal failures short-circuit,
//! retryable failures are re-attempted up to a fixed maximum. Backoff sleeps
//! run through `tokio::time::sleep`, so dropping the returned future cancels
//! the wait.

use counsel_core::{CallOutcome, FailureCode, FailureReason};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Base delay; attempt k sleeps `base * 2^k` plus jitter.
    pub base_delay: Duration,
    /// Ceiling for any single delay (before jitter).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Retry policy implementation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before re-attempting after a failed attempt (0-indexed).
    ///
    /// Exponential growth capped at the configured maximum, plus uniform
    /// jitter bounded by the base delay so concurrent retries under a shared
    /// rate limiter do not synchronize.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay.as_millis() as f64;
        let exp = base * 2_f64.powi(attempt.min(31) as i32);
        let capped = exp.min(self.config.max_delay.as_millis() as f64);

        let jitter = if base > 0.0 {
            rand::thread_rng().gen_range(0.0..base)
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter) as u64)
    }

    /// Execute an attempt function under this policy.
    ///
    /// Performs at most `1 + max_retries` attempts. A retryable failure
    /// surviving all attempts is converted into a terminal failure carrying
    /// the original reason and the attempt count.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> CallOutcome<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CallOutcome<T>>,
    {
        let mut last_reason: Option<FailureReason> = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                CallOutcome::Success(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "retry succeeded");
                    }
                    return CallOutcome::Success(value);
                }
                CallOutcome::Terminal(reason) => return CallOutcome::Terminal(reason),
                CallOutcome::Retryable(reason) => {
                    if attempt == self.config.max_retries {
                        last_reason = Some(reason);
                        break;
                    }
                    let delay = self.delay_for_attempt(attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_attempts = self.config.max_retries + 1,
                        delay_ms = delay.as_millis(),
                        reason = %reason,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    last_reason = Some(reason);
                }
            }
        }

        let attempts = self.config.max_retries + 1;
        let reason = last_reason.map_or_else(
            || FailureReason::new(FailureCode::Exhausted, "retries exhausted", None),
            |last| {
                FailureReason::new(
                    FailureCode::Exhausted,
                    format!("retries exhausted after {attempts} attempts; last: {last}"),
                    last.status,
                )
            },
        );
        CallOutcome::Terminal(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        })
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let outcome = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    CallOutcome::Success(42)
                }
            })
            .await;

        assert!(matches!(outcome, CallOutcome::Success(42)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_always_retryable_performs_exact_attempts() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let outcome: CallOutcome<()> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    CallOutcome::retryable(FailureCode::Network, "flaky", Some(503))
                }
            })
            .await;

        // Exactly 1 + max_retries attempts, ending terminal.
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        match outcome {
            CallOutcome::Terminal(reason) => {
                assert_eq!(reason.code, FailureCode::Exhausted);
                assert!(reason.message.contains("4 attempts"));
                assert!(reason.message.contains("flaky"));
            }
            _ => unreachable!("must be terminal after exhaustion"),
        }
    }

    #[tokio::test]
    async fn test_success_on_kth_attempt() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let outcome = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    let attempt = c.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        CallOutcome::retryable(FailureCode::Timeout, "slow", None)
                    } else {
                        CallOutcome::Success("done")
                    }
                }
            })
            .await;

        assert!(matches!(outcome, CallOutcome::Success("done")));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_short_circuits() {
        let policy = fast_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);

        let outcome: CallOutcome<()> = policy
            .execute(|| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    CallOutcome::terminal(FailureCode::Auth, "bad key", Some(401))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        match outcome {
            CallOutcome::Terminal(reason) => assert_eq!(reason.code, FailureCode::Auth),
            _ => unreachable!("terminal must pass through"),
        }
    }

    #[test]
    fn test_delay_growth_and_jitter_bound() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        });

        for attempt in 0..4 {
            let expected = 100 * 2_u64.pow(attempt);
            for _ in 0..20 {
                let delay = policy.delay_for_attempt(attempt).as_millis() as u64;
                // Jitter is bounded by the base delay.
                assert!(delay >= expected, "delay {delay} below floor {expected}");
                assert!(delay < expected + 100, "delay {delay} above jitter bound");
            }
        }
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        });

        let delay = policy.delay_for_attempt(8);
        assert!(delay <= Duration::from_millis(400));
    }
}
