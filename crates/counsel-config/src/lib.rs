//! # Counsel Config
//!
//! Configuration management for the Counsel LLM gateway.
//!
//! Parses environment-style key/value configuration into an immutable,
//! validated [`Settings`] object, distinguishing configured values from
//! unmodified template placeholders, and resolves per-provider credential
//! bundles. Loading never touches the network and never reads the ambient
//! process environment except through the explicit [`Settings::from_env`]
//! entry point.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod settings;

// Re-export main types
pub use credentials::{CredentialError, CredentialStore, ProviderCredentials};
pub use settings::{
    AzureSettings, ConfigError, GeminiSettings, LimitSettings, LogLevel, LoggingSettings,
    RetrySettings, Settings,
};
