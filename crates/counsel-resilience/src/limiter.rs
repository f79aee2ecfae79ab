//! Token-bucket rate limiter.
//!
//! One bucket is shared by every concurrent caller in the process. The
//! bucket state is the gateway's only mutable shared structure; all
//! admission and refill updates happen under a single mutex so concurrent
//! admitters never lose updates. Sleeps happen outside the lock and are
//! cancel-safe: dropping an `admit` future abandons the wait without
//! consuming tokens.

use counsel_core::GatewayError;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Admission failures.
#[derive(Debug, Error)]
pub enum AdmitError {
    /// Capacity did not become available within the configured maximum wait.
    #[error("rate limit admission timed out after {waited:?}")]
    Timeout {
        /// Time spent waiting before giving up.
        waited: Duration,
    },

    /// The requested cost can never fit in this bucket.
    #[error("admission cost {cost} exceeds bucket capacity {capacity}")]
    CostExceedsCapacity {
        /// Requested cost.
        cost: u32,
        /// Bucket capacity.
        capacity: u32,
    },
}

impl From<AdmitError> for GatewayError {
    fn from(err: AdmitError) -> Self {
        match err {
            AdmitError::Timeout { waited } => Self::RateLimitTimeout { waited },
            AdmitError::CostExceedsCapacity { .. } => Self::Validation {
                message: err.to_string(),
            },
        }
    }
}

/// An admission token. Purely a receipt: tokens are replenished by refill,
/// not by dropping the permit.
#[derive(Debug)]
pub struct Permit {
    /// Cost that was admitted.
    pub cost: u32,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket gate shared by all callers within the process.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    max_wait: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a bucket that starts full.
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: f64, max_wait: Duration) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            max_wait,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Admit a call of the given cost, waiting for refill when necessary.
    ///
    /// # Errors
    /// Returns [`AdmitError::Timeout`] when capacity does not become
    /// available within the configured maximum wait, and
    /// [`AdmitError::CostExceedsCapacity`] when the cost can never fit.
    pub async fn admit(&self, cost: u32) -> Result<Permit, AdmitError> {
        if f64::from(cost) > self.capacity {
            return Err(AdmitError::CostExceedsCapacity {
                cost,
                capacity: self.capacity as u32,
            });
        }

        let started = Instant::now();
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= f64::from(cost) {
                    state.tokens -= f64::from(cost);
                    None
                } else {
                    let deficit = f64::from(cost) - state.tokens;
                    Some(Duration::from_secs_f64(deficit / self.refill_per_sec))
                }
            };

            let Some(wait) = wait else {
                return Ok(Permit { cost });
            };

            let waited = started.elapsed();
            if waited + wait > self.max_wait {
                warn!(
                    waited_ms = waited.as_millis(),
                    needed_ms = wait.as_millis(),
                    max_wait_ms = self.max_wait.as_millis(),
                    "rate limit admission timed out"
                );
                return Err(AdmitError::Timeout { waited });
            }

            debug!(wait_ms = wait.as_millis(), cost, "waiting for rate limit refill");
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens =
            (state.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
    }
}
