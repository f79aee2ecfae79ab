//! # Counsel Core
//!
//! Core types, traits, and error handling for the Counsel LLM gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Generation and embedding request/response types
//! - The provider trait abstracting Azure OpenAI and Gemini
//! - The three-way call outcome driving retry decisions
//! - Error types and handling
//! - Validated domain types (newtypes)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod outcome;
pub mod provider;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use outcome::{CallOutcome, FailureCode, FailureReason};
pub use provider::{LlmProvider, Operation, ProviderKind};
pub use request::{EmbeddingRequest, GenerationRequest};
pub use response::{EmbeddingResult, GenerationResult, TokenUsage};
pub use types::{MaxTokens, Temperature};
