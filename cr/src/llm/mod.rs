//! LLM client module for ChatRag
//!
//! Streams chat completions from an OpenAI-compatible provider.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openrouter;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openrouter::OpenRouterClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, StreamChunk, TokenUsage};

use crate::config::LlmConfig;

/// Create the configured LLM client
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(base_url = %config.base_url, "create_client: called");
    Ok(Arc::new(OpenRouterClient::from_config(config)?))
}
