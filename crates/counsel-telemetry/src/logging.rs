//! Logging initialization.
//!
//! Two sinks, mirroring the level/destination knobs in the settings: a
//! human-readable console layer is always installed, and when a log file is
//! configured a JSON layer is appended to it (parent directories created as
//! needed).

use counsel_config::LoggingSettings;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The log file or its parent directory could not be created.
    #[error("failed to open log file: {0}")]
    LogFile(#[from] std::io::Error),

    /// A global subscriber was already installed.
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Install the global tracing subscriber for this process.
///
/// Call once at startup, after loading settings. The filter honors
/// `RUST_LOG` when set, falling back to the configured level.
///
/// # Errors
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_filter()));

    let console_layer = fmt::layer().with_target(true);

    let file_layer = match &settings.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().json().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer.and_then(file_layer).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    Ok(())
}
