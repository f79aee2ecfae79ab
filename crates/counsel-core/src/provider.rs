//! Provider abstraction shared by all backends.

use crate::outcome::CallOutcome;
use crate::request::{EmbeddingRequest, GenerationRequest};
use crate::response::{EmbeddingResult, GenerationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Azure-hosted OpenAI-compatible deployment.
    Azure,
    /// Google Gemini deployment.
    Gemini,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Azure => f.write_str("azure"),
            Self::Gemini => f.write_str("gemini"),
        }
    }
}

/// Gateway operation, used in logs and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Text generation.
    Generate,
    /// Text embedding.
    Embed,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => f.write_str("generate"),
            Self::Embed => f.write_str("embed"),
        }
    }
}

/// A backend capable of one generation or embedding call per invocation.
///
/// Implementations are stateless per call: no session state is retained
/// across invocations beyond a reusable transport handle, and the transport
/// must be safe for concurrent use.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Which backend this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Largest embedding batch this backend accepts in one call.
    fn max_embed_batch(&self) -> usize;

    /// Issue one generation call.
    async fn generate(&self, request: &GenerationRequest) -> CallOutcome<GenerationResult>;

    /// Issue one embedding call.
    ///
    /// A successful outcome carries exactly one vector per input text, in
    /// input order. Implementations validate this before returning success;
    /// a count mismatch is a terminal failure.
    async fn embed(&self, request: &EmbeddingRequest) -> CallOutcome<EmbeddingResult>;
}
