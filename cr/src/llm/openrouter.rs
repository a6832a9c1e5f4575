//! OpenRouter chat-completions client
//!
//! Speaks the OpenAI chat-completions wire format over server-sent events,
//! so any compatible base URL works.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::is_retryable_status;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, StreamChunk, TokenUsage};
use crate::config::LlmConfig;

/// Maximum number of retries when opening the stream
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Sentinel data line that ends an OpenAI-style stream
const DONE_MARKER: &str = "[DONE]";

/// Title reported to OpenRouter for request attribution
const APP_TITLE: &str = "chatrag";

/// OpenRouter (or any OpenAI-compatible) streaming client
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenRouterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Create a client from configuration, reading the key from the environment
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(base_url = %config.base_url, model = %config.model, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(&config.base_url, api_key, config.timeout())
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the chat-completions API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(model = %request.model, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        messages.extend(request.messages.iter().map(|m| serde_json::json!(m)));

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": true,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Open the event stream, retrying transient failures with backoff
    async fn open_stream(&self, body: &serde_json::Value) -> Result<EventSource, LlmError> {
        let url = self.completions_url();
        debug!(%url, "open_stream: called");

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "open_stream: retrying connection after error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let http_request = self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .header("X-Title", APP_TITLE)
                .json(body);

            let mut es = EventSource::new(http_request).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
            es.set_retry_policy(Box::new(Never));

            match es.next().await {
                Some(Ok(Event::Open)) => {
                    debug!(attempt, "open_stream: connected");
                    return Ok(es);
                }
                Some(Ok(Event::Message(_))) => {
                    es.close();
                    return Err(LlmError::InvalidResponse("Stream sent data before opening".to_string()));
                }
                Some(Err(e)) => {
                    es.close();
                    let err = map_stream_error(e).await;
                    if err.is_retryable() && !err.is_rate_limit() && attempt < MAX_RETRIES {
                        debug!(attempt, error = %err, "open_stream: retryable error");
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                None => {
                    return Err(LlmError::Stream("Stream closed before opening".to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(model = %request.model, "stream: called");
        let body = self.build_request_body(&request);

        let mut es = match self.open_stream(&body).await {
            Ok(es) => es,
            Err(e) => {
                let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                return Err(e);
            }
        };

        let mut content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = TokenUsage::default();
        let mut cancelled = false;

        loop {
            let event = tokio::select! {
                event = es.next() => event,
                _ = chunk_tx.closed() => {
                    debug!("stream: receiver dropped, closing upstream");
                    cancelled = true;
                    break;
                }
            };
            let Some(event) = event else {
                debug!("stream: upstream ended");
                break;
            };

            match event {
                Ok(Event::Open) => {
                    debug!("stream: Event::Open");
                }
                Ok(Event::Message(msg)) => {
                    if msg.data.trim() == DONE_MARKER {
                        debug!("stream: done marker");
                        break;
                    }

                    let chunk: ChatStreamChunk = match serde_json::from_str(&msg.data) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            warn!(error = %e, "stream: skipping undecodable event");
                            continue;
                        }
                    };

                    if let Some(error) = chunk.error {
                        es.close();
                        let err = error.into_llm_error();
                        let _ = chunk_tx.send(StreamChunk::Error(err.to_string())).await;
                        return Err(err);
                    }

                    for choice in chunk.choices {
                        if let Some(text) = choice.delta.content
                            && !text.is_empty()
                        {
                            content.push_str(&text);
                            if chunk_tx.send(StreamChunk::TextDelta(text)).await.is_err() {
                                cancelled = true;
                            }
                        }
                        if let Some(reason) = choice.finish_reason {
                            debug!(%reason, "stream: finish_reason");
                            stop_reason = StopReason::from_finish_reason(&reason);
                        }
                    }

                    if let Some(u) = chunk.usage {
                        usage.input_tokens = u.prompt_tokens;
                        usage.output_tokens = u.completion_tokens;
                    }

                    if cancelled {
                        debug!("stream: receiver dropped, closing upstream");
                        break;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("stream: StreamEnded");
                    break;
                }
                Err(e) => {
                    es.close();
                    let err = map_stream_error(e).await;
                    debug!(error = %err, "stream: Event error");
                    let _ = chunk_tx.send(StreamChunk::Error(err.to_string())).await;
                    return Err(err);
                }
            }
        }

        es.close();

        if cancelled {
            info!(chars = content.len(), "stream: cancelled by client");
        } else {
            debug!(chars = content.len(), "stream: complete");
            let _ = chunk_tx
                .send(StreamChunk::MessageDone {
                    stop_reason: stop_reason.clone(),
                    usage,
                })
                .await;
        }

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage,
        })
    }
}

/// Convert an event-source failure into an LlmError
async fn map_stream_error(error: reqwest_eventsource::Error) -> LlmError {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let status = status.as_u16();
            if status == 429 {
                debug!("map_stream_error: rate limited (429)");
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return LlmError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                };
            }
            let text = response.text().await.unwrap_or_default();
            debug!(status, retryable = is_retryable_status(status), "map_stream_error: API error");
            LlmError::ApiError {
                status,
                message: extract_error_message(&text),
            }
        }
        reqwest_eventsource::Error::Transport(e) => LlmError::Network(e),
        other => LlmError::Stream(other.to_string()),
    }
}

/// Pull `error.message` out of a JSON error body, or fall back to the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

// Streaming wire types

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    usage: Option<ChatUsage>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatStreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    code: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn into_llm_error(self) -> LlmError {
        let status = self
            .code
            .as_ref()
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(500);
        LlmError::ApiError {
            status,
            message: self.message,
        }
    }
}
