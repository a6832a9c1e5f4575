//! Chat completion request/response types
//!
//! These follow the OpenAI chat-completions shape, which OpenRouter and
//! most hosted providers accept.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one streamed reply
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Provider model identifier, e.g. `openai/gpt-3.5-turbo`
    pub model: String,

    /// System prompt sent ahead of the conversation
    pub system_prompt: String,

    /// Conversation turns (one user message for the chat endpoint)
    pub messages: Vec<Message>,

    /// Optional cap on response tokens
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// A single-turn request: system prompt plus one user message
    pub fn single_turn(model: impl Into<String>, system_prompt: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(text)],
            max_tokens: None,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Why the model stopped producing output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    EndTurn,
    MaxTokens,
    ContentFilter,
    Other(String),
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "stop" => Self::EndTurn,
            "length" => Self::MaxTokens,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Incremental output while a reply is streaming
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A piece of reply text
    TextDelta(String),

    /// The reply finished normally
    MessageDone { stop_reason: StopReason, usage: TokenUsage },

    /// The upstream call failed mid-reply
    Error(String),
}

/// The complete reply once streaming has finished
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}
