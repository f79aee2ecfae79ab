//! Azure OpenAI client.
//!
//! Supports Azure OpenAI Service with deployment-based model access.
//! Key differences from vanilla OpenAI:
//! - URL structure: `{endpoint}/openai/deployments/{deployment}/...`
//! - Authentication via API key in the `api-key` header
//! - API version required as a query parameter

use async_trait::async_trait;
use counsel_config::AzureSettings;
use counsel_core::{
    CallOutcome, EmbeddingRequest, EmbeddingResult, FailureCode, GatewayError, GenerationRequest,
    GenerationResult, LlmProvider, ProviderKind, TokenUsage,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Azure embedding deployments reject batches beyond this size.
pub const MAX_EMBED_BATCH: usize = 16;

/// Azure OpenAI client implementation.
pub struct AzureOpenAiClient {
    settings: AzureSettings,
    client: Client,
}

impl AzureOpenAiClient {
    /// Create a new Azure OpenAI client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: AzureSettings, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| GatewayError::Config {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { settings, client })
    }

    fn deployment_url(&self, deployment: &str, action: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.settings.endpoint.as_str().trim_end_matches('/'),
            deployment,
            action,
            self.settings.api_version
        )
    }

    /// Map a non-success HTTP response to an outcome.
    fn map_error<T>(status: u16, body: &str) -> CallOutcome<T> {
        let message = serde_json::from_str::<AzureErrorResponse>(body)
            .map_or_else(|_| format!("HTTP {status}"), |e| e.error.message);

        match status {
            401 | 403 => CallOutcome::terminal(FailureCode::Auth, message, Some(status)),
            408 => CallOutcome::retryable(FailureCode::Timeout, message, Some(status)),
            429 => CallOutcome::retryable(FailureCode::QuotaExhausted, message, Some(status)),
            500..=599 => CallOutcome::retryable(FailureCode::Network, message, Some(status)),
            _ => CallOutcome::terminal(FailureCode::InvalidRequest, message, Some(status)),
        }
    }

    fn map_transport_error<T>(error: &reqwest::Error) -> CallOutcome<T> {
        if error.is_timeout() {
            CallOutcome::retryable(FailureCode::Timeout, "request timed out", None)
        } else {
            CallOutcome::retryable(FailureCode::Network, format!("request failed: {error}"), None)
        }
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn max_embed_batch(&self) -> usize {
        MAX_EMBED_BATCH
    }

    async fn generate(&self, request: &GenerationRequest) -> CallOutcome<GenerationResult> {
        let url = self.deployment_url(&self.settings.deployment, "chat/completions");

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(AzureMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(AzureMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        let body = AzureChatRequest {
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(deployment = %self.settings.deployment, "sending Azure chat completion");
        let started = Instant::now();

        let response = match self
            .client
            .post(&url)
            .header("api-key", self.settings.api_key.expose_secret())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Self::map_transport_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Self::map_error(status.as_u16(), &body);
        }

        let parsed: AzureChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return CallOutcome::terminal(
                    FailureCode::MalformedResponse,
                    format!("undecodable chat response: {e}"),
                    None,
                )
            }
        };

        let Some(choice) = parsed.choices.into_iter().next() else {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                "response contained no choices",
                None,
            );
        };
        let Some(text) = choice.message.content else {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                "choice contained no content",
                None,
            );
        };

        CallOutcome::Success(GenerationResult {
            text,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            provider: ProviderKind::Azure,
            latency: started.elapsed(),
        })
    }

    async fn embed(&self, request: &EmbeddingRequest) -> CallOutcome<EmbeddingResult> {
        let url = self.deployment_url(&self.settings.embeddings_deployment, "embeddings");
        let body = AzureEmbeddingRequest {
            input: &request.texts,
        };

        debug!(
            deployment = %self.settings.embeddings_deployment,
            inputs = request.len(),
            "sending Azure embeddings request"
        );
        let started = Instant::now();

        let response = match self
            .client
            .post(&url)
            .header("api-key", self.settings.api_key.expose_secret())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Self::map_transport_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Self::map_error(status.as_u16(), &body);
        }

        let parsed: AzureEmbeddingResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return CallOutcome::terminal(
                    FailureCode::MalformedResponse,
                    format!("undecodable embeddings response: {e}"),
                    None,
                )
            }
        };

        if parsed.data.len() != request.len() {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                format!(
                    "embedding count mismatch: {} inputs, {} vectors",
                    request.len(),
                    parsed.data.len()
                ),
                None,
            );
        }

        // The API tags each vector with its input index; place by index so
        // the result order always matches the input order.
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; request.len()];
        for item in parsed.data {
            match vectors.get_mut(item.index) {
                Some(slot @ None) => *slot = Some(item.embedding),
                _ => {
                    return CallOutcome::terminal(
                        FailureCode::MalformedResponse,
                        format!("duplicate or out-of-range embedding index {}", item.index),
                        None,
                    )
                }
            }
        }
        let Some(vectors) = vectors.into_iter().collect::<Option<Vec<_>>>() else {
            return CallOutcome::terminal(
                FailureCode::MalformedResponse,
                "embedding response left input indexes unfilled",
                None,
            );
        };

        CallOutcome::Success(EmbeddingResult {
            vectors,
            provider: ProviderKind::Azure,
            latency: started.elapsed(),
        })
    }
}

// ============================================================================
// Azure OpenAI API types
// ============================================================================

#[derive(Debug, Serialize)]
struct AzureChatRequest {
    messages: Vec<AzureMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AzureMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AzureChatResponse {
    choices: Vec<AzureChoice>,
    #[serde(default)]
    usage: Option<AzureUsage>,
}

#[derive(Debug, Deserialize)]
struct AzureChoice {
    message: AzureResponseMessage,
}

#[derive(Debug, Deserialize)]
struct AzureResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AzureEmbeddingRequest<'a> {
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AzureEmbeddingResponse {
    data: Vec<AzureEmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct AzureEmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct AzureErrorResponse {
    error: AzureError,
}

#[derive(Debug, Deserialize)]
struct AzureError {
    message: String,
}

// ============================================================================
// Tests
// ============================================================================
