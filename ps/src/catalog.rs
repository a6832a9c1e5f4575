//! Prompt catalog
//!
//! Policy layer over [`PromptStore`]: protected ids, create/update
//! existence rules and input validation are all checked here before the
//! store touches the filesystem.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::error::PromptError;
use crate::store::{PromptDocument, PromptStore};

/// Longest accepted id
pub const MAX_ID_LEN: usize = 64;

/// Lowercase slug: letters, digits, `-` and `_`, not starting with a separator
static SLUG: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$"));

/// Fields a caller supplies when creating or updating a prompt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptInput {
    pub title: String,
    pub description: String,
    pub content: String,
}

impl PromptInput {
    pub fn new(title: impl Into<String>, description: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            content: content.into(),
        }
    }

    /// Required fields present and metadata fits on one line
    pub fn validate(&self) -> Result<(), PromptError> {
        if self.title.trim().is_empty() {
            return Err(PromptError::Validation("Title is required".to_string()));
        }
        if self.title.contains(['\r', '\n']) {
            return Err(PromptError::Validation("Title must be a single line".to_string()));
        }
        if self.description.contains(['\r', '\n']) {
            return Err(PromptError::Validation("Description must be a single line".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(PromptError::Validation("Content is required".to_string()));
        }
        Ok(())
    }
}

/// Check `id` against the slug rule: lowercase letters, digits, `-` and `_`,
/// starting with a letter or digit, at most [`MAX_ID_LEN`] characters
pub fn validate_id(id: &str) -> Result<(), PromptError> {
    let slug = SLUG
        .as_ref()
        .map_err(|e| PromptError::Validation(e.to_string()))?;
    let reason = if id.is_empty() {
        Some("id is required".to_string())
    } else if id.len() > MAX_ID_LEN {
        Some(format!("id must be at most {} characters", MAX_ID_LEN))
    } else if !slug.is_match(id) {
        Some("use lowercase letters, digits, '-' and '_' only".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PromptError::InvalidId {
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Enforces create/update/delete rules on top of a shared store
#[derive(Clone)]
pub struct PromptCatalog {
    store: Arc<PromptStore>,
}

impl PromptCatalog {
    pub fn new(store: Arc<PromptStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<PromptStore> {
        &self.store
    }

    pub fn list(&self) -> Vec<PromptDocument> {
        self.store.list()
    }

    pub fn get(&self, id: &str) -> Result<PromptDocument, PromptError> {
        debug!(%id, "PromptCatalog::get: called");
        self.store
            .get_by_id(id)
            .ok_or_else(|| PromptError::NotFound(id.to_string()))
    }

    /// Create a new prompt. Fails if the id is protected or already taken.
    pub fn create(&self, id: &str, input: &PromptInput) -> Result<PromptDocument, PromptError> {
        debug!(%id, "PromptCatalog::create: called");
        validate_id(id)?;
        self.reject_protected(id)?;
        input.validate()?;

        if self.store.exists(id) {
            warn!(%id, "Refusing to create prompt that already exists");
            return Err(PromptError::Conflict(id.to_string()));
        }

        let doc = self.store.save(id, &input.title, &input.description, &input.content)?;
        info!(%id, "Created prompt");
        Ok(doc)
    }

    /// Overwrite an existing prompt. Fails if protected or missing.
    ///
    /// The slug rule only gates new ids, so hand-written files with other
    /// names stay editable.
    pub fn update(&self, id: &str, input: &PromptInput) -> Result<PromptDocument, PromptError> {
        debug!(%id, "PromptCatalog::update: called");
        self.reject_protected(id)?;
        input.validate()?;

        if !self.store.exists(id) {
            warn!(%id, "Refusing to update missing prompt");
            return Err(PromptError::NotFound(id.to_string()));
        }

        let doc = self.store.save(id, &input.title, &input.description, &input.content)?;
        info!(%id, "Updated prompt");
        Ok(doc)
    }

    /// Remove a prompt. Fails if protected or missing.
    pub fn delete(&self, id: &str) -> Result<(), PromptError> {
        debug!(%id, "PromptCatalog::delete: called");
        self.reject_protected(id)?;

        if !self.store.exists(id) {
            warn!(%id, "Refusing to delete missing prompt");
            return Err(PromptError::NotFound(id.to_string()));
        }

        self.store.delete(id)
    }

    fn reject_protected(&self, id: &str) -> Result<(), PromptError> {
        if self.store.is_protected(id) {
            warn!(%id, "Rejected change to protected prompt");
            return Err(PromptError::Protected(id.to_string()));
        }
        Ok(())
    }
}
