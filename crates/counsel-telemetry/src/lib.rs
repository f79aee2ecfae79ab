//! # Counsel Telemetry
//!
//! Structured logging for the Counsel LLM gateway.
//!
//! Driven by the `LOG_LEVEL` / `LOG_FILE` settings: human-readable output
//! on the console, JSON records appended to the configured file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;

// Re-export main types
pub use logging::{init_logging, TelemetryError};
