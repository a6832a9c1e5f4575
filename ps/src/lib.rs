//! PromptStore - markdown prompt templates on disk
//!
//! Each prompt is one `<id>.md` file with an optional frontmatter block
//! holding its title and description. Parsed documents are cached and
//! reused until the file's modification time changes.
//!
//! # Layout
//!
//! ```text
//! prompts/
//! ├── default.md       # protected, read-only through the catalog
//! ├── welcome.md
//! └── code-review.md
//! ```
//!
//! # File format
//!
//! ```text
//! ---
//! title: Welcome
//! description: "Intro prompt"
//! ---
//! Hello, {{name}}!
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use promptstore::{PromptCatalog, PromptInput, PromptStore};
//!
//! let store = Arc::new(PromptStore::new("prompts"));
//! let catalog = PromptCatalog::new(store.clone());
//! catalog.create("welcome", &PromptInput::new("Welcome", "Intro prompt", "Hello!"))?;
//! let all = store.list();
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod frontmatter;
mod store;

pub use catalog::{PromptCatalog, PromptInput, validate_id};
pub use error::PromptError;
pub use frontmatter::{Frontmatter, Parsed};
pub use store::{CacheStats, PROMPT_EXTENSION, PROTECTED_IDS, PromptDocument, PromptStore, is_protected};

/// Default prompts directory, relative to the working directory
pub const DEFAULT_PROMPTS_DIR: &str = "prompts";
