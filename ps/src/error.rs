//! Prompt store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the prompt store and catalog
///
/// Expected outcomes ("no such prompt") come back as `NotFound` or `None`,
/// never as panics.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt not found: {0}")]
    NotFound(String),

    #[error("Prompt '{0}' is protected and cannot be modified")]
    Protected(String),

    #[error("Prompt '{0}' already exists")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid prompt id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("I/O error on prompt '{id}' at {}: {source}", path.display())]
    Io {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PromptError {
    /// True for failures caused by the caller's input rather than the filesystem
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PromptError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(PromptError::NotFound("x".into()).to_string(), "Prompt not found: x");
        assert_eq!(
            PromptError::Protected("default".into()).to_string(),
            "Prompt 'default' is protected and cannot be modified"
        );
        assert_eq!(PromptError::Validation("Title is required".into()).to_string(), "Title is required");
    }

    #[test]
    fn test_is_client_error() {
        assert!(PromptError::Conflict("a".into()).is_client_error());
        let io = PromptError::Io {
            id: "a".into(),
            path: PathBuf::from("/tmp/a.md"),
            source: std::io::Error::other("boom"),
        };
        assert!(!io.is_client_error());
        assert!(io.to_string().contains("/tmp/a.md"));
    }
}
