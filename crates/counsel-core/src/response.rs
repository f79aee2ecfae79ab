//! Response types for the gateway.
//!
//! Results are immutable once constructed and carry enough context
//! (provider, usage, latency) for callers to log or bill without
//! touching provider-specific shapes.

use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token usage counters, when the provider reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

/// Outcome of a successful generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated text.
    pub text: String,
    /// Token usage, absent when the provider omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Which backend produced this result.
    pub provider: ProviderKind,
    /// Wall-clock latency of the provider call.
    pub latency: Duration,
}

/// Outcome of a successful embedding call.
///
/// Vectors are in the same order as the request's input texts. That ordering
/// is load-bearing for downstream indexing and is validated by the provider
/// clients before this value is ever constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// One vector per input text, input order preserved.
    pub vectors: Vec<Vec<f32>>,
    /// Which backend produced this result.
    pub provider: ProviderKind,
    /// Wall-clock latency of the provider call.
    pub latency: Duration,
}

impl EmbeddingResult {
    /// Number of vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the result is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
