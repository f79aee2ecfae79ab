//! # Counsel Resilience
//!
//! Resilience primitives for the Counsel LLM gateway:
//! - Retry policy with bounded exponential backoff and jitter
//! - Token-bucket rate limiter shared by all concurrent callers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod limiter;
pub mod retry;

// Re-export main types
pub use limiter::{AdmitError, Permit, TokenBucket};
pub use retry::{RetryConfig, RetryPolicy};
