//! LlmClient trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CompletionRequest, CompletionResponse, LlmError, StreamChunk};

/// Stateless LLM client - each call is independent
///
/// The chat endpoint sends one system prompt and one user message per call;
/// no conversation state is kept between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Streaming completion
    ///
    /// Sends chunks to the provided channel as they arrive and returns the
    /// final complete response. When the receiving side is dropped the
    /// client stops reading and closes the upstream request.
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError>;
}
