//! Shared application state handed to every handler

use std::sync::Arc;

use promptstore::{PromptCatalog, PromptStore};

use crate::config::{Config, LlmConfig};
use crate::llm::LlmClient;
use crate::rag::{ChromaProbe, RagConfigStore, RagError};

/// Fallbacks for chat requests that name no model or system prompt
#[derive(Debug, Clone)]
pub struct ChatDefaults {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
}

impl From<&LlmConfig> for ChatDefaults {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

pub struct AppState {
    pub prompts: PromptCatalog,
    pub rag: RagConfigStore,
    pub probe: ChromaProbe,
    pub llm: Arc<dyn LlmClient>,
    pub chat: ChatDefaults,
}

impl AppState {
    /// Wire stores and probes from configuration around an existing LLM client
    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>) -> Result<Self, RagError> {
        Ok(Self {
            prompts: PromptCatalog::new(Arc::new(PromptStore::new(&config.prompts.dir))),
            rag: RagConfigStore::new(&config.rag.config_path),
            probe: ChromaProbe::from_settings(&config.rag)?,
            llm,
            chat: ChatDefaults::from(&config.llm),
        })
    }
}
