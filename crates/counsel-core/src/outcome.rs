//! Three-way call outcomes for provider invocations.
//!
//! Provider clients translate their own error space (HTTP status codes,
//! quota/auth errors, malformed bodies) into [`CallOutcome`], which is the
//! only failure shape the retry layer and the gateway ever look at.

use serde::{Deserialize, Serialize};

/// Reason code for a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// Authentication or authorization failure (401/403).
    Auth,
    /// The request was rejected as invalid (400-class).
    InvalidRequest,
    /// Provider quota or rate limit hit (429).
    QuotaExhausted,
    /// The provider response did not match its documented schema.
    MalformedResponse,
    /// Transport-level failure (connect, TLS, 5xx).
    Network,
    /// The call exceeded its deadline.
    Timeout,
    /// Retries were exhausted without success.
    Exhausted,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::QuotaExhausted => "quota_exhausted",
            Self::MalformedResponse => "malformed_response",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

/// Why a provider call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    /// Reason code for caller-side fallback decisions.
    pub code: FailureCode,
    /// Human-readable context, never a raw provider body.
    pub message: String,
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
}

impl FailureReason {
    /// Create a new failure reason.
    #[must_use]
    pub fn new(code: FailureCode, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Result of a single provider call attempt.
#[derive(Debug, Clone)]
pub enum CallOutcome<T> {
    /// The call succeeded with a payload.
    Success(T),
    /// The call failed transiently and is safe to re-attempt.
    Retryable(FailureReason),
    /// The call failed in a way that must not be retried blindly.
    Terminal(FailureReason),
}

impl<T> CallOutcome<T> {
    /// Shorthand for a retryable failure.
    #[must_use]
    pub fn retryable(code: FailureCode, message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Retryable(FailureReason::new(code, message, status))
    }

    /// Shorthand for a terminal failure.
    #[must_use]
    pub fn terminal(code: FailureCode, message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Terminal(FailureReason::new(code, message, status))
    }

    /// Check whether this outcome is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Map the success payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            Self::Success(value) => CallOutcome::Success(f(value)),
            Self::Retryable(reason) => CallOutcome::Retryable(reason),
            Self::Terminal(reason) => CallOutcome::Terminal(reason),
        }
    }

    /// Convert into a result, treating any failure as an error.
    ///
    /// # Errors
    /// Returns the failure reason for both retryable and terminal failures.
    pub fn into_result(self) -> Result<T, FailureReason> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Retryable(reason) | Self::Terminal(reason) => Err(reason),
        }
    }
}
