//! Streaming chat endpoint

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, Span, debug, info, warn};

use super::{ApiError, AppState};
use crate::llm::{CompletionRequest, StreamChunk};

/// Buffered chunks between the upstream reader and the response body
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Render a chunk as response text; completion markers produce nothing
fn chunk_text(chunk: StreamChunk) -> Option<Result<String, Infallible>> {
    match chunk {
        StreamChunk::TextDelta(text) => Some(Ok(text)),
        StreamChunk::Error(message) => Some(Ok(format!("Error: {}", message))),
        StreamChunk::MessageDone { .. } => None,
    }
}

/// POST /api/chat - stream the model's reply as plain text
///
/// Dropping the response body (client disconnect) closes the channel, which
/// makes the LLM client abandon the upstream request.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    if req.message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let model = non_blank(req.model).unwrap_or_else(|| state.chat.model.clone());
    let system_prompt = non_blank(req.system_prompt).unwrap_or_else(|| state.chat.system_prompt.clone());
    debug!(%model, message_len = req.message.len(), "chat: called");

    let mut request = CompletionRequest::single_turn(model, system_prompt, req.message);
    request.max_tokens = state.chat.max_tokens;

    let (chunk_tx, chunk_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let llm = state.llm.clone();
    tokio::spawn(
        async move {
            match llm.stream(request, chunk_tx).await {
                Ok(response) => info!(chars = response.content.len(), "chat: reply complete"),
                Err(e) => warn!(error = %e, "chat: upstream failed"),
            }
        }
        .instrument(Span::current()),
    );

    let body = ReceiverStream::new(chunk_rx).filter_map(chunk_text);
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{LlmClient, StopReason, TokenUsage};
    use crate::server::test_support::{spawn_app, test_state};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_text() {
        assert_eq!(chunk_text(StreamChunk::TextDelta("hi".to_string())), Some(Ok("hi".to_string())));
        assert_eq!(
            chunk_text(StreamChunk::Error("boom".to_string())),
            Some(Ok("Error: boom".to_string()))
        );
        assert_eq!(
            chunk_text(StreamChunk::MessageDone {
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            }),
            None
        );
    }

    #[tokio::test]
    async fn test_chat_streams_plain_text() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::new(&["Hello", ", ", "world"]));
        let base = spawn_app(test_state(&temp, llm.clone())).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .json(&json!({"message": "hi"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert!(
            response.headers()[reqwest::header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        assert_eq!(response.text().await.unwrap(), "Hello, world");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "openai/gpt-3.5-turbo");
        assert_eq!(requests[0].system_prompt, "You are a helpful assistant.");
        assert_eq!(requests[0].messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_chat_uses_requested_model_and_prompt() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::new(&["ok"]));
        let base = spawn_app(test_state(&temp, llm.clone())).await;

        let text = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .json(&json!({"message": "hi", "model": "anthropic/claude-3-haiku", "system_prompt": "Be terse."}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(text, "ok");
        let requests = llm.requests();
        assert_eq!(requests[0].model, "anthropic/claude-3-haiku");
        assert_eq!(requests[0].system_prompt, "Be terse.");
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let temp = TempDir::new().unwrap();
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(&[]));
        let base = spawn_app(test_state(&temp, llm)).await;
        let client = reqwest::Client::new();

        for body in [json!({}), json!({"message": ""})] {
            let response = client
                .post(format!("{}/api/chat", base))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 400);
            let error: serde_json::Value = response.json().await.unwrap();
            assert_eq!(error, json!({"error": "Message is required"}));
        }
    }

    #[tokio::test]
    async fn test_chat_upstream_error_in_text() {
        let temp = TempDir::new().unwrap();
        let llm = Arc::new(MockLlmClient::failing_after(&["Partial "], "API error 401: No auth credentials found"));
        let base = spawn_app(test_state(&temp, llm)).await;

        let text = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .json(&json!({"message": "hi"}))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(text, "Partial Error: API error 401: No auth credentials found");
    }
}
