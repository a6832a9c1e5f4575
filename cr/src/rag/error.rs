//! RAG settings error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// Rejected input; the message is shown to the user as-is
    #[error("{0}")]
    Validation(String),

    #[error("Failed to save config: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Database(#[from] rusqlite::Error),

    /// A connectivity probe failed before reaching the database
    #[error("{0}")]
    Probe(String),
}

impl RagError {
    pub fn validation(message: impl Into<String>) -> Self {
        RagError::Validation(message.into())
    }

    /// True when the caller sent something unusable
    pub fn is_client_error(&self) -> bool {
        matches!(self, RagError::Validation(_))
    }
}
