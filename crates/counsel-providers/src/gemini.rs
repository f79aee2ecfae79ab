//! Google Gemini client.
//!
//! Talks to the Google AI Studio API
//! (`generativelanguage.googleapis.com`):
//! - Generation: `models/{model}:generateContent`
//! - Embeddings: `models/{model}:batchEmbedContents`
//!
//! Authentication is an API key in the `key` query parameter. Gemini puts
//! the system prompt in a dedicated `systemInstruction` field rather than
//! the message list.

use async_trait::async_trait;
use counsel_config::GeminiSettings;
use counsel_core::{
    CallOutcome, EmbeddingRequest, EmbeddingResult, FailureCode, GatewayError, GenerationRequest,
    GenerationResult, LlmProvider, ProviderKind, TokenUsage,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default Google AI Studio endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// `batchEmbedContents` rejects batches beyond this size.
pub const MAX_EMBED_BATCH: usize = 100;

/// Google Gemini client implementation.
pub struct GeminiClient {
    settings: GeminiSettings,
    client: Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client against the production endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: GeminiSettings, timeout: Duration) -> Result<Self, GatewayError> {
        Self::with_base_url(settings, timeout, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint. Used by tests.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(
        settings: GeminiSettings,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| GatewayError::Config {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            settings,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url,
            model,
            action,
            self.settings.api_key.expose_secret()
        )
    }

    fn map_error<T>(status: u16, body: &str) -> CallOutcome<T> {
        let message = serde_json::from_str::<GeminiErrorResponse>(body)
            .map_or_else(|_| format!("HTTP {status}"), |e| e.error.message);

        match status {
            401 | 403 => CallOutcome::terminal(FailureCode::Auth, message, Some(status)),
            408 => CallOutcome::retryable(FailureCode::Timeout, message, Some(status)),
            429 => CallOutcome::retryable(FailureCode::QuotaExhausted, message, Some(status)),
            500..=599 => CallOutcome::retryable(FailureCode::Network, message, Some(status)),
            _ => CallOutcome::terminal(FailureCode::InvalidRequest, message, Some(status)),
        }
    }

    fn map_transport_error<T>(error: reqwest::Error) -> CallOutcome<T> {
        if error.is_timeout() {
            CallOutcome::retryable(FailureCode::Timeout, "request timed out", None)
        } else {
            // The request URL carries the API key; strip it before the
            // error text can reach logs or caller-facing messages.
            CallOutcome::retryable(
                FailureCode::Network,
                format!("request failed: {}", error.without_url()),
                None,
            )
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn max_embed_batch(&self) -> usize {
        MAX_EMBED_BATCH
    }

    async fn generate(&self, request: &GenerationRequest) -> CallOutcome<GenerationResult> {
        let url = self.model_url(&self.settings.model, "generateContent");

        let body = GeminiGenerateRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|system| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system.clone(),
                }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        debug!(model = %self.settings.model, "sending Gemini generateContent");
        let started = Instant::now();

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return Self::map_transport_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Self::map_error(status.as_u16(), &body);
        }

        let parsed: GeminiGenerateResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return CallOutcome::terminal(
                    FailureCode::MalformedResponse,
                    format!("undecodable generateContent response: {e}"),
                    None,
                )
            }
        };

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                "response contained no candidates",
                None,
            );
        };

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        if text.is_empty() {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                "candidate contained no text parts",
                None,
            );
        }

        CallOutcome::Success(GenerationResult {
            text,
            usage: parsed.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            provider: ProviderKind::Gemini,
            latency: started.elapsed(),
        })
    }

    async fn embed(&self, request: &EmbeddingRequest) -> CallOutcome<EmbeddingResult> {
        let url = self.model_url(&self.settings.embeddings_model, "batchEmbedContents");
        let model_path = format!("models/{}", self.settings.embeddings_model);

        let body = GeminiBatchEmbedRequest {
            requests: request
                .texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: model_path.clone(),
                    content: GeminiEmbedContent {
                        parts: vec![GeminiPart { text: text.clone() }],
                    },
                })
                .collect(),
        };

        debug!(
            model = %self.settings.embeddings_model,
            inputs = request.len(),
            "sending Gemini batchEmbedContents"
        );
        let started = Instant::now();

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return Self::map_transport_error(e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Self::map_error(status.as_u16(), &body);
        }

        let parsed: GeminiBatchEmbedResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return CallOutcome::terminal(
                    FailureCode::MalformedResponse,
                    format!("undecodable batchEmbedContents response: {e}"),
                    None,
                )
            }
        };

        // batchEmbedContents returns one embedding per request, in request
        // order. A different count means the response cannot be trusted.
        if parsed.embeddings.len() != request.len() {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                format!(
                    "embedding count mismatch: {} inputs, {} vectors",
                    request.len(),
                    parsed.embeddings.len()
                ),
                None,
            );
        }

        CallOutcome::Success(EmbeddingResult {
            vectors: parsed.embeddings.into_iter().map(|e| e.values).collect(),
            provider: ProviderKind::Gemini,
            latency: started.elapsed(),
        })
    }
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiGenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}

#[derive(Debug, Serialize)]
struct GeminiBatchEmbedRequest {
    requests: Vec<GeminiEmbedRequest>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedRequest {
    model: String,
    content: GeminiEmbedContent,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiBatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

// ============================================================================
// Tests
// ============================================================================
