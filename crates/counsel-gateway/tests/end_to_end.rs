//! End-to-end gateway tests against mock provider backends.
//!
//! Each test stands up a wiremock server, points a gateway at it through
//! the normal configuration path, and exercises the full pipeline:
//! validation, rate-limit admission, retries, and the provider wire format.

use counsel_config::Settings;
use counsel_core::{
    EmbeddingRequest, FailureCode, GatewayError, GenerationRequest, LlmProvider, Operation,
    ProviderKind,
};
use counsel_gateway::LlmGateway;
use counsel_providers::GeminiClient;
use counsel_resilience::{RetryConfig, RetryPolicy, TokenBucket};
use secrecy::SecretString;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn azure_env(endpoint: &str) -> HashMap<String, String> {
    [
        ("AZURE_ENDPOINT", endpoint),
        ("AZURE_OPENAI_API_KEY", "sk-azure-test"),
        ("AZURE_DEPLOYMENT", "gpt-4o"),
        ("API_VERSION", "2024-02-15-preview"),
        ("AZURE_EMBEDDINGS_DEPLOYMENT", "text-embedding-3-small"),
        ("RETRY_BASE_DELAY_MS", "1"),
        ("REQUEST_TIMEOUT_SECS", "5"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn azure_gateway(endpoint: &str) -> LlmGateway {
    let settings = Settings::from_map(&azure_env(endpoint)).expect("settings");
    LlmGateway::from_settings(&settings).expect("gateway")
}

fn chat_body(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}],
        "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
    })
}

#[tokio::test]
async fn test_azure_generate_full_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4o/chat/completions"))
        .and(query_param("api-version", "2024-02-15-preview"))
        .and(header("api-key", "sk-azure-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Clause 4 requires...")))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = azure_gateway(&server.uri());
    assert_eq!(gateway.provider_kind(), ProviderKind::Azure);

    let result = gateway
        .generate(&GenerationRequest::precise("Summarize clause 4"))
        .await
        .expect("generation");

    assert_eq!(result.text, "Clause 4 requires...");
    assert_eq!(result.provider, ProviderKind::Azure);
    assert_eq!(result.usage.expect("usage").total_tokens, 21);
}

#[tokio::test]
async fn test_transient_failures_retried_until_success() {
    let server = MockServer::start().await;

    // Two 503s, then the real answer. Mounted first so they are consumed
    // before the fallthrough succeeds.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = azure_gateway(&server.uri());
    let result = gateway
        .generate(&GenerationRequest::new("hola"))
        .await
        .expect("recovered after retries");
    assert_eq!(result.text, "recovered");
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Access denied due to invalid subscription key"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = azure_gateway(&server.uri());
    let err = gateway
        .generate(&GenerationRequest::new("hola"))
        .await
        .unwrap_err();

    match err {
        GatewayError::Llm {
            provider,
            operation,
            code,
            ..
        } => {
            assert_eq!(provider, ProviderKind::Azure);
            assert_eq!(operation, Operation::Generate);
            assert_eq!(code, FailureCode::Auth);
        }
        other => unreachable!("expected an LLM error, got {other}"),
    }
    // The expect(1) on the mock verifies no retry happened.
    server.verify().await;
}

#[tokio::test]
async fn test_retry_exhaustion_surfaces_last_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let gateway = azure_gateway(&server.uri());
    let err = gateway
        .generate(&GenerationRequest::new("hola"))
        .await
        .unwrap_err();

    assert_eq!(err.failure_code(), Some(FailureCode::Exhausted));
    assert!(err.is_caller_recoverable());
    server.verify().await;
}

#[tokio::test]
async fn test_gemini_embed_preserves_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:batchEmbedContents"))
        .and(query_param("key", "AIza-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [
                {"values": [0.1, 0.2, 0.3]},
                {"values": [0.4, 0.5, 0.6]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gemini_gateway(&server.uri());
    let request: EmbeddingRequest = ["contrato de arrendamiento", "cl\u{e1}usula de rescisi\u{f3}n"]
        .into_iter()
        .collect();

    let result = gateway.embed(&request).await.expect("embedding");
    assert_eq!(result.provider, ProviderKind::Gemini);
    assert_eq!(result.vectors[0], vec![0.1, 0.2, 0.3]);
    assert_eq!(result.vectors[1], vec![0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn test_gemini_embed_count_mismatch_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{"values": [0.1]}]
        })))
        .mount(&server)
        .await;

    let gateway = gemini_gateway(&server.uri());
    let request: EmbeddingRequest = ["a", "b"].into_iter().collect();
    let err = gateway.embed(&request).await.unwrap_err();

    assert_eq!(err.failure_code(), Some(FailureCode::MalformedResponse));
}

#[tokio::test]
async fn test_rate_limit_timeout_reaches_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("ok")))
        .mount(&server)
        .await;

    let mut env = azure_env(&server.uri());
    env.insert("RATE_LIMIT_CAPACITY".to_string(), "1".to_string());
    env.insert("RATE_LIMIT_REFILL_PER_SEC".to_string(), "0.001".to_string());
    env.insert("RATE_LIMIT_MAX_WAIT_SECS".to_string(), "0".to_string());
    let settings = Settings::from_map(&env).expect("settings");
    let gateway = LlmGateway::from_settings(&settings).expect("gateway");

    gateway
        .generate(&GenerationRequest::new("first"))
        .await
        .expect("first call admitted");
    let err = gateway
        .generate(&GenerationRequest::new("second"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RateLimitTimeout { .. }));
}

#[tokio::test]
async fn test_successful_call_emits_structured_log() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("ok")))
        .mount(&server)
        .await;

    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let gateway = azure_gateway(&server.uri());
    gateway
        .generate(&GenerationRequest::new("Summarize clause 4"))
        .await
        .expect("generation");

    let logs = writer.contents();
    assert!(logs.contains("gateway call completed"), "logs: {logs}");
    assert!(logs.contains("provider=azure"), "logs: {logs}");
    assert!(logs.contains("operation=generate"), "logs: {logs}");
}

fn gemini_gateway(base_url: &str) -> LlmGateway {
    let settings = counsel_config::GeminiSettings {
        api_key: SecretString::new("AIza-test".to_string()),
        model: "gemini-1.5-pro".to_string(),
        embeddings_model: "text-embedding-004".to_string(),
    };
    let client = GeminiClient::with_base_url(settings, Duration::from_secs(5), base_url)
        .expect("client");
    LlmGateway::new(
        Arc::new(client) as Arc<dyn LlmProvider>,
        Arc::new(TokenBucket::new(100, 100.0, Duration::from_secs(1))),
        RetryPolicy::new(RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        }),
    )
}

/// In-memory log sink for asserting on emitted records.
#[derive(Clone, Default)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("lock")).into_owned()
    }
}

impl std::io::Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
