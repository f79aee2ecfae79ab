//! The gateway façade.
//!
//! Holds no state beyond references to its collaborators; one instance is
//! safe to share across all callers. The pipeline for both operations is:
//! validate → admit through the shared token bucket → run the provider call
//! under the retry policy → log and return the normalized result.

use counsel_config::{CredentialStore, ProviderCredentials, Settings};
use counsel_core::{
    CallOutcome, EmbeddingRequest, EmbeddingResult, GatewayError, GatewayResult,
    GenerationRequest, GenerationResult, LlmProvider, MaxTokens, Operation, ProviderKind,
    Temperature,
};
use counsel_providers::{AzureOpenAiClient, GeminiClient};
use counsel_resilience::{RetryConfig, RetryPolicy, TokenBucket};
use std::sync::Arc;
use tracing::{error, info};

/// Cost of one gateway call against the token bucket.
const CALL_COST: u32 = 1;

/// The provider-agnostic LLM/embedding gateway.
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    limiter: Arc<TokenBucket>,
    retry: RetryPolicy,
    default_temperature: Temperature,
    default_max_tokens: MaxTokens,
}

impl LlmGateway {
    /// Wire a gateway from validated settings, constructing the real client
    /// for whichever provider is configured.
    ///
    /// # Errors
    /// Returns a credential or configuration error when the client cannot
    /// be built. Never falls back to a dummy provider.
    pub fn from_settings(settings: &Settings) -> GatewayResult<Self> {
        let store = CredentialStore::new(settings);
        let provider: Arc<dyn LlmProvider> = match store.resolve(settings.provider)? {
            ProviderCredentials::Azure(azure) => {
                Arc::new(AzureOpenAiClient::new(azure, settings.request_timeout)?)
            }
            ProviderCredentials::Gemini(gemini) => {
                Arc::new(GeminiClient::new(gemini, settings.request_timeout)?)
            }
        };

        let limiter = Arc::new(TokenBucket::new(
            settings.limits.capacity,
            settings.limits.refill_per_sec,
            settings.limits.max_wait,
        ));
        let retry = RetryPolicy::new(RetryConfig {
            max_retries: settings.retry.max_retries,
            base_delay: settings.retry.base_delay,
            max_delay: settings.retry.max_delay,
        });

        Ok(Self {
            provider,
            limiter,
            retry,
            default_temperature: settings.default_temperature,
            default_max_tokens: settings.max_tokens,
        })
    }

    /// Wire a gateway from explicit collaborators. Used by tests and by
    /// consumers that construct their own provider client.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        limiter: Arc<TokenBucket>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            limiter,
            retry,
            default_temperature: Temperature::default(),
            default_max_tokens: MaxTokens::default(),
        }
    }

    /// Which backend this gateway talks to.
    #[must_use]
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Generate text for a prompt.
    ///
    /// Transient provider failures are retried internally; only a terminal
    /// failure (or retry exhaustion) surfaces, as [`GatewayError::Llm`].
    ///
    /// # Errors
    /// Returns a validation error before any network call, a rate-limit
    /// timeout when admission fails, or an LLM error on terminal failure.
    pub async fn generate(&self, request: &GenerationRequest) -> GatewayResult<GenerationResult> {
        request.validate()?;
        let effective = self.with_defaults(request);

        self.limiter.admit(CALL_COST).await?;

        let provider = &self.provider;
        let outcome = self
            .retry
            .execute(|| provider.generate(&effective))
            .await;

        match outcome {
            CallOutcome::Success(result) => {
                info!(
                    provider = %result.provider,
                    operation = %Operation::Generate,
                    latency_ms = result.latency.as_millis(),
                    total_tokens = result.usage.map(|u| u.total_tokens),
                    "gateway call completed"
                );
                Ok(result)
            }
            CallOutcome::Retryable(reason) | CallOutcome::Terminal(reason) => {
                error!(
                    provider = %self.provider.kind(),
                    operation = %Operation::Generate,
                    code = %reason.code,
                    "gateway call failed: {}",
                    reason.message
                );
                Err(GatewayError::from_failure(
                    self.provider.kind(),
                    Operation::Generate,
                    reason,
                ))
            }
        }
    }

    /// Embed a batch of texts.
    ///
    /// The returned vectors are in input order; that invariant is enforced
    /// by the provider clients and a violation is a terminal failure, never
    /// a silently reordered result.
    ///
    /// # Errors
    /// Same failure modes as [`LlmGateway::generate`].
    pub async fn embed(&self, request: &EmbeddingRequest) -> GatewayResult<EmbeddingResult> {
        request.validate(self.provider.max_embed_batch())?;

        self.limiter.admit(CALL_COST).await?;

        let provider = &self.provider;
        let outcome = self.retry.execute(|| provider.embed(request)).await;

        match outcome {
            CallOutcome::Success(result) => {
                info!(
                    provider = %result.provider,
                    operation = %Operation::Embed,
                    latency_ms = result.latency.as_millis(),
                    vectors = result.len(),
                    "gateway call completed"
                );
                Ok(result)
            }
            CallOutcome::Retryable(reason) | CallOutcome::Terminal(reason) => {
                error!(
                    provider = %self.provider.kind(),
                    operation = %Operation::Embed,
                    code = %reason.code,
                    "gateway call failed: {}",
                    reason.message
                );
                Err(GatewayError::from_failure(
                    self.provider.kind(),
                    Operation::Embed,
                    reason,
                ))
            }
        }
    }

    /// Fill unset generation knobs from the configured defaults.
    fn with_defaults(&self, request: &GenerationRequest) -> GenerationRequest {
        let mut effective = request.clone();
        effective
            .temperature
            .get_or_insert(self.default_temperature.value());
        effective
            .max_tokens
            .get_or_insert(self.default_max_tokens.value());
        effective
    }
}
