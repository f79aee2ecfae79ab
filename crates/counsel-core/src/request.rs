//! Request types for the gateway.
//!
//! Requests are owned transiently by the caller; the gateway never retains
//! them past the call.

use crate::error::GatewayError;
use crate::types::{MaxTokens, Temperature};
use serde::{Deserialize, Serialize};

/// A single text-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Prompt text. Must be non-empty.
    pub prompt: String,

    /// Optional system instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Temperature override. Falls back to the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max output tokens override. Falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a request with just a prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// A precise request (temperature 0.1), suited to legal drafting.
    #[must_use]
    pub fn precise(prompt: impl Into<String>) -> Self {
        Self::new(prompt).with_temperature(0.1)
    }

    /// An analytical request (temperature 0.0), suited to document analysis.
    #[must_use]
    pub fn analytical(prompt: impl Into<String>) -> Self {
        Self::new(prompt).with_temperature(0.0)
    }

    /// A creative request (temperature 0.7).
    #[must_use]
    pub fn creative(prompt: impl Into<String>) -> Self {
        Self::new(prompt).with_temperature(0.7)
    }

    /// Set the system instruction.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature override.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max-tokens override.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Get the validated temperature override.
    ///
    /// # Errors
    /// Returns an error if the override is out of range.
    pub fn validated_temperature(&self) -> Result<Option<Temperature>, GatewayError> {
        self.temperature
            .map(Temperature::new)
            .transpose()
            .map_err(|message| GatewayError::Validation { message })
    }

    /// Get the validated max-tokens override.
    ///
    /// # Errors
    /// Returns an error if the override is zero.
    pub fn validated_max_tokens(&self) -> Result<Option<MaxTokens>, GatewayError> {
        self.max_tokens
            .map(MaxTokens::new)
            .transpose()
            .map_err(|message| GatewayError::Validation { message })
    }

    /// Validate the whole request.
    ///
    /// # Errors
    /// Returns an error if the prompt is empty or an override is out of range.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.prompt.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "prompt cannot be empty".to_string(),
            });
        }
        self.validated_temperature()?;
        self.validated_max_tokens()?;
        Ok(())
    }
}

/// An ordered batch of texts to embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Input texts, 1..N, order-significant.
    pub texts: Vec<String>,
}

impl EmbeddingRequest {
    /// Create a request from an ordered list of texts.
    #[must_use]
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts }
    }

    /// Number of input texts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Validate the batch shape against a provider's batch limit.
    ///
    /// # Errors
    /// Returns an error if the batch is empty, oversized, or contains an
    /// empty text.
    pub fn validate(&self, max_batch: usize) -> Result<(), GatewayError> {
        if self.texts.is_empty() {
            return Err(GatewayError::Validation {
                message: "embedding input cannot be empty".to_string(),
            });
        }
        if self.texts.len() > max_batch {
            return Err(GatewayError::Validation {
                message: format!(
                    "embedding batch of {} exceeds provider limit of {max_batch}",
                    self.texts.len()
                ),
            });
        }
        if let Some(idx) = self.texts.iter().position(|t| t.trim().is_empty()) {
            return Err(GatewayError::Validation {
                message: format!("embedding input at index {idx} is empty"),
            });
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for EmbeddingRequest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}
