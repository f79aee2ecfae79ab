//! # Counsel Gateway
//!
//! The façade unifying Azure OpenAI and Gemini access behind one contract.
//!
//! A single [`LlmGateway`] instance is shared by all callers in the process.
//! Every outbound model call flows through it: validation, rate-limit
//! admission, bounded retries, and structured logging are applied uniformly
//! regardless of backend.
//!
//! ```no_run
//! use counsel_config::Settings;
//! use counsel_core::GenerationRequest;
//! use counsel_gateway::LlmGateway;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let gateway = LlmGateway::from_settings(&settings)?;
//!
//! let result = gateway
//!     .generate(&GenerationRequest::precise("Summarize clause 4"))
//!     .await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gateway;

// Re-export main types
pub use gateway::LlmGateway;
