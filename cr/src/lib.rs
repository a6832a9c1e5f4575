//! ChatRag - chat proxy, prompt templates and vector database settings
//!
//! A small web backend that:
//!
//! - streams chat replies from an OpenAI-compatible provider (OpenRouter by
//!   default) as plain text,
//! - serves the markdown prompt templates managed by [`promptstore`],
//! - stores and probes the connection settings of a ChromaDB instance.
//!
//! # Modules
//!
//! - [`config`]: YAML process configuration with environment overrides
//! - [`llm`]: streaming chat-completions client
//! - [`rag`]: vector database settings, path checks and connection tests
//! - [`server`]: axum router and handlers

pub mod cli;
pub mod config;
pub mod llm;
pub mod rag;
pub mod server;

pub use config::Config;
pub use llm::{LlmClient, LlmError, OpenRouterClient, create_client};
pub use rag::{ChromaProbe, RagConfig, RagConfigInput, RagConfigStore, RagError, RagMode};
pub use server::{AppState, router, serve};
