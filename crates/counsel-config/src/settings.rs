//! Typed, validated settings loaded once at process start.
//!
//! The loader consumes an environment-style key/value map. Values that still
//! look like template placeholders are treated as absent, so a deployment
//! that forgot to fill in a key fails at startup instead of attempting a
//! live call with a dummy credential.
//!
//! Placeholder convention: a value counts as unconfigured when it is empty,
//! wrapped in angle brackets (`<your key here>`), or starts with `your-` /
//! `your_` (case-insensitive).

use counsel_core::{GatewayError, MaxTokens, ProviderKind, Temperature};
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration loading errors. Startup-fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is missing or still a template placeholder.
    #[error("missing required configuration key {key}")]
    MissingKey {
        /// The key that was absent or placeholder-valued.
        key: &'static str,
    },

    /// A key has a value that cannot be parsed or is out of range.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// The offending key.
        key: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Neither provider's credential set is configured.
    #[error("no provider configured: populate either the Azure or the Gemini key set")]
    NoProvider,

    /// Both providers' credential sets are configured.
    #[error("both Azure and Gemini are configured: exactly one provider must be selected")]
    BothProviders,
}

impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

/// Log verbosity, the four recognized levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Debug and above.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and above.
    Warning,
    /// Errors only.
    Error,
}

impl LogLevel {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            other => Err(ConfigError::InvalidValue {
                key: keys::LOG_LEVEL,
                message: format!("unknown log level {other:?}"),
            }),
        }
    }

    /// The equivalent `tracing` filter directive.
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Log destination configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Minimum level emitted.
    pub level: LogLevel,
    /// Optional file sink; console output is always on.
    pub file: Option<PathBuf>,
}

/// Azure OpenAI credential and deployment set.
#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: Url,
    /// API key, sent in the `api-key` header.
    pub api_key: SecretString,
    /// API version query parameter.
    pub api_version: String,
    /// Deployment name for generation.
    pub deployment: String,
    /// Deployment name for embeddings. Defaults to the generation deployment.
    pub embeddings_deployment: String,
}

/// Gemini credential and model set.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// API key, sent as the `key` query parameter.
    pub api_key: SecretString,
    /// Model identifier for generation.
    pub model: String,
    /// Model identifier for embeddings.
    pub embeddings_model: String,
}

/// Token-bucket rate limiting knobs.
#[derive(Debug, Clone)]
pub struct LimitSettings {
    /// Bucket capacity (burst size).
    pub capacity: u32,
    /// Tokens refilled per second.
    pub refill_per_sec: f64,
    /// Maximum time a caller waits for admission.
    pub max_wait: Duration,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            capacity: 60,
            refill_per_sec: 1.0,
            max_wait: Duration::from_secs(30),
        }
    }
}

/// Retry knobs for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Base backoff delay; also bounds the jitter.
    pub base_delay: Duration,
    /// Ceiling for any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Immutable settings, loaded once at process start.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Which backend is active.
    pub provider: ProviderKind,
    /// Azure credential set, present when `provider` is Azure.
    pub azure: Option<AzureSettings>,
    /// Gemini credential set, present when `provider` is Gemini.
    pub gemini: Option<GeminiSettings>,
    /// Default sampling temperature for generation.
    pub default_temperature: Temperature,
    /// Default max output tokens for generation.
    pub max_tokens: MaxTokens,
    /// Log level and destination.
    pub logging: LoggingSettings,
    /// Rate limiting configuration.
    pub limits: LimitSettings,
    /// Retry configuration.
    pub retry: RetrySettings,
    /// Per-call HTTP timeout.
    pub request_timeout: Duration,
}

/// Recognized configuration keys.
pub mod keys {
    /// Azure generation deployment name.
    pub const AZURE_DEPLOYMENT: &str = "AZURE_DEPLOYMENT";
    /// Azure API version.
    pub const API_VERSION: &str = "API_VERSION";
    /// Azure API key.
    pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
    /// Azure resource endpoint URL.
    pub const AZURE_ENDPOINT: &str = "AZURE_ENDPOINT";
    /// Azure embeddings deployment name.
    pub const AZURE_EMBEDDINGS_DEPLOYMENT: &str = "AZURE_EMBEDDINGS_DEPLOYMENT";
    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: &str = "DEFAULT_TEMPERATURE";
    /// Default max output tokens.
    pub const MAX_TOKENS: &str = "MAX_TOKENS";
    /// Gemini API key.
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    /// Gemini embeddings model.
    pub const GEMINI_EMBEDDINGS: &str = "GEMINI_EMBEDDINGS";
    /// Gemini generation model.
    pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
    /// Log level (DEBUG, INFO, WARNING, ERROR).
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log file path.
    pub const LOG_FILE: &str = "LOG_FILE";
    /// Token-bucket capacity.
    pub const RATE_LIMIT_CAPACITY: &str = "RATE_LIMIT_CAPACITY";
    /// Token-bucket refill rate per second.
    pub const RATE_LIMIT_REFILL_PER_SEC: &str = "RATE_LIMIT_REFILL_PER_SEC";
    /// Maximum admission wait in seconds.
    pub const RATE_LIMIT_MAX_WAIT_SECS: &str = "RATE_LIMIT_MAX_WAIT_SECS";
    /// Additional retry attempts after the first.
    pub const RETRY_MAX_ATTEMPTS: &str = "RETRY_MAX_ATTEMPTS";
    /// Base backoff delay in milliseconds.
    pub const RETRY_BASE_DELAY_MS: &str = "RETRY_BASE_DELAY_MS";
    /// Per-call HTTP timeout in seconds.
    pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
}

/// Fallback Gemini embeddings model when `GEMINI_EMBEDDINGS` is unset.
pub const DEFAULT_GEMINI_EMBEDDINGS: &str = "text-embedding-004";

impl Settings {
    /// Load settings from an explicit key/value map.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when a selected provider is missing a
    /// required field, a numeric field is out of range, the log level is
    /// unrecognized, or zero or two providers are configured.
    pub fn from_map(source: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let source = Source { map: source };

        let azure = Self::load_azure(&source)?;
        let gemini = Self::load_gemini(&source)?;

        let provider = match (&azure, &gemini) {
            (Some(_), None) => ProviderKind::Azure,
            (None, Some(_)) => ProviderKind::Gemini,
            (None, None) => return Err(ConfigError::NoProvider),
            (Some(_), Some(_)) => return Err(ConfigError::BothProviders),
        };

        let default_temperature = match source.get(keys::DEFAULT_TEMPERATURE) {
            Some(raw) => {
                let value = raw.parse::<f32>().map_err(|e| ConfigError::InvalidValue {
                    key: keys::DEFAULT_TEMPERATURE,
                    message: e.to_string(),
                })?;
                Temperature::new(value).map_err(|message| ConfigError::InvalidValue {
                    key: keys::DEFAULT_TEMPERATURE,
                    message,
                })?
            }
            None => Temperature::default(),
        };

        let max_tokens = match source.get(keys::MAX_TOKENS) {
            Some(raw) => {
                let value = raw.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                    key: keys::MAX_TOKENS,
                    message: e.to_string(),
                })?;
                MaxTokens::new(value).map_err(|message| ConfigError::InvalidValue {
                    key: keys::MAX_TOKENS,
                    message,
                })?
            }
            None => MaxTokens::default(),
        };

        let logging = LoggingSettings {
            level: match source.get(keys::LOG_LEVEL) {
                Some(raw) => LogLevel::parse(raw)?,
                None => LogLevel::default(),
            },
            file: source.get(keys::LOG_FILE).map(PathBuf::from),
        };

        let defaults = LimitSettings::default();
        let limits = LimitSettings {
            capacity: source
                .parse_optional(keys::RATE_LIMIT_CAPACITY)?
                .unwrap_or(defaults.capacity),
            refill_per_sec: source
                .parse_optional::<f64>(keys::RATE_LIMIT_REFILL_PER_SEC)?
                .unwrap_or(defaults.refill_per_sec),
            max_wait: source
                .parse_optional::<u64>(keys::RATE_LIMIT_MAX_WAIT_SECS)?
                .map_or(defaults.max_wait, Duration::from_secs),
        };
        if limits.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: keys::RATE_LIMIT_CAPACITY,
                message: "capacity must be positive".to_string(),
            });
        }
        if !(limits.refill_per_sec.is_finite() && limits.refill_per_sec > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: keys::RATE_LIMIT_REFILL_PER_SEC,
                message: "refill rate must be positive".to_string(),
            });
        }

        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_retries: source
                .parse_optional(keys::RETRY_MAX_ATTEMPTS)?
                .unwrap_or(retry_defaults.max_retries),
            base_delay: source
                .parse_optional::<u64>(keys::RETRY_BASE_DELAY_MS)?
                .map_or(retry_defaults.base_delay, Duration::from_millis),
            max_delay: retry_defaults.max_delay,
        };

        let request_timeout = source
            .parse_optional::<u64>(keys::REQUEST_TIMEOUT_SECS)?
            .map_or(Duration::from_secs(120), Duration::from_secs);

        Ok(Self {
            provider,
            azure,
            gemini,
            default_temperature,
            max_tokens,
            logging,
            limits,
            retry,
            request_timeout,
        })
    }

    /// Load settings from the process environment.
    ///
    /// This is the only place the ambient environment is read; everything
    /// downstream works from the returned value.
    ///
    /// # Errors
    /// Same failure modes as [`Settings::from_map`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let map: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&map)
    }

    fn load_azure(source: &Source<'_>) -> Result<Option<AzureSettings>, ConfigError> {
        let required = [
            keys::AZURE_ENDPOINT,
            keys::AZURE_OPENAI_API_KEY,
            keys::AZURE_DEPLOYMENT,
            keys::API_VERSION,
        ];
        if required.iter().all(|key| source.get(key).is_none()) {
            return Ok(None);
        }

        let endpoint_raw = source.require(keys::AZURE_ENDPOINT)?;
        let endpoint = Url::parse(endpoint_raw).map_err(|e| ConfigError::InvalidValue {
            key: keys::AZURE_ENDPOINT,
            message: e.to_string(),
        })?;
        let api_key = SecretString::new(source.require(keys::AZURE_OPENAI_API_KEY)?.to_string());
        let deployment = source.require(keys::AZURE_DEPLOYMENT)?.to_string();
        let api_version = source.require(keys::API_VERSION)?.to_string();
        let embeddings_deployment = source
            .get(keys::AZURE_EMBEDDINGS_DEPLOYMENT)
            .unwrap_or(deployment.as_str())
            .to_string();

        Ok(Some(AzureSettings {
            endpoint,
            api_key,
            api_version,
            deployment,
            embeddings_deployment,
        }))
    }

    fn load_gemini(source: &Source<'_>) -> Result<Option<GeminiSettings>, ConfigError> {
        let required = [keys::GOOGLE_API_KEY, keys::GEMINI_MODEL];
        if required.iter().all(|key| source.get(key).is_none()) {
            return Ok(None);
        }

        let api_key = SecretString::new(source.require(keys::GOOGLE_API_KEY)?.to_string());
        let model = source.require(keys::GEMINI_MODEL)?.to_string();
        let embeddings_model = source
            .get(keys::GEMINI_EMBEDDINGS)
            .unwrap_or(DEFAULT_GEMINI_EMBEDDINGS)
            .to_string();

        Ok(Some(GeminiSettings {
            api_key,
            model,
            embeddings_model,
        }))
    }
}

/// Read-only view over the key/value map with placeholder filtering.
struct Source<'a> {
    map: &'a HashMap<String, String>,
}

impl Source<'_> {
    /// Get a configured value; placeholder values count as absent.
    fn get(&self, key: &str) -> Option<&str> {
        let value = self.map.get(key).map(String::as_str)?;
        if is_placeholder(value) {
            None
        } else {
            Some(value)
        }
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingKey { key })
    }

    fn parse_optional<T: std::str::FromStr>(
        &self,
        key: &'static str,
    ) -> Result<Option<T>, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key,
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Whether a value still looks like an unmodified template placeholder.
fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    lower.starts_with("your-") || lower.starts_with("your_")
}
