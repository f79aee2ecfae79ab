//! # Counsel Providers
//!
//! Backend client implementations for the Counsel LLM gateway:
//! - Azure OpenAI (deployment-based chat completions and embeddings)
//! - Google Gemini (generateContent and batchEmbedContents)
//!
//! Each client issues one generation or embedding call per invocation and
//! maps its provider's error space into the gateway's three-way
//! [`counsel_core::CallOutcome`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod azure;
pub mod gemini;

// Re-export main types
pub use azure::AzureOpenAiClient;
pub use gemini::GeminiClient;
