//! Caller-facing error taxonomy.
//!
//! Configuration and credential failures are startup-fatal and carried here
//! only as wrapped messages; their structured forms live in the config crate.
//! Rate-limit timeouts and terminal provider failures are caller-recoverable.

use crate::outcome::{FailureCode, FailureReason};
use crate::provider::{Operation, ProviderKind};
use std::time::Duration;
use thiserror::Error;

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the gateway to its callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed, missing, or placeholder configuration. Startup-fatal.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Provider/credential mismatch. Startup-fatal.
    #[error("credential error: {message}")]
    Credential {
        /// What was wrong.
        message: String,
    },

    /// A request failed shape validation before any network call.
    #[error("validation error: {message}")]
    Validation {
        /// What was wrong.
        message: String,
    },

    /// The rate limiter could not admit the call within the configured wait.
    #[error("rate limit admission timed out after {waited:?}")]
    RateLimitTimeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// A provider call failed terminally, after any internal retries.
    #[error("{provider} {operation} failed ({code}): {message}")]
    Llm {
        /// Which backend failed.
        provider: ProviderKind,
        /// Which operation failed.
        operation: Operation,
        /// Reason code for fallback decisions.
        code: FailureCode,
        /// Context, never a raw provider stack trace.
        message: String,
    },
}

impl GatewayError {
    /// Build an LLM error from a terminal failure reason.
    #[must_use]
    pub fn from_failure(
        provider: ProviderKind,
        operation: Operation,
        reason: FailureReason,
    ) -> Self {
        Self::Llm {
            provider,
            operation,
            code: reason.code,
            message: reason.message,
        }
    }

    /// Reason code, when this is a provider failure.
    #[must_use]
    pub fn failure_code(&self) -> Option<FailureCode> {
        match self {
            Self::Llm { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry later.
    #[must_use]
    pub fn is_caller_recoverable(&self) -> bool {
        matches!(self, Self::RateLimitTimeout { .. } | Self::Llm { .. })
    }
}
