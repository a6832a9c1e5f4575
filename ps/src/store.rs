//! Core PromptStore implementation
//!
//! The directory is the source of truth. Each `<id>.md` file is parsed once
//! and cached together with its modification time; a cache entry is reused
//! only while the file's current mtime equals the cached one.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

use crate::error::PromptError;
use crate::frontmatter::{self, Frontmatter};

/// File extension for prompt documents
pub const PROMPT_EXTENSION: &str = "md";

/// Ids that mutating operations must refuse
pub const PROTECTED_IDS: &[&str] = &["default"];

/// Pure membership test against [`PROTECTED_IDS`]
pub fn is_protected(id: &str) -> bool {
    PROTECTED_IDS.contains(&id)
}

/// A prompt template loaded from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDocument {
    /// Filename stem, unique within the store
    pub id: String,
    /// From metadata, defaults to the id
    pub title: String,
    /// From metadata, defaults to empty
    pub description: String,
    /// Body after the metadata block, trimmed
    pub content: String,
}

impl PromptDocument {
    /// Build a document from the raw text of `<id>.md`
    pub fn from_text(id: &str, text: &str) -> Self {
        let parsed = frontmatter::parse(text);
        Self {
            id: id.to_string(),
            title: parsed.metadata.get("title").unwrap_or(id).to_string(),
            description: parsed.metadata.get("description").unwrap_or_default().to_string(),
            content: parsed.body,
        }
    }

    /// Serialize back to the on-disk form
    pub fn to_text(&self) -> String {
        let mut metadata = Frontmatter::new();
        metadata.insert("title", self.title.as_str());
        metadata.insert("description", self.description.as_str());
        metadata.render(&self.content)
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Files read and parsed from disk
    pub reads: u64,
    /// Entries currently cached
    pub entries: usize,
}

struct CacheEntry {
    document: PromptDocument,
    modified: SystemTime,
}

/// Directory-backed prompt store with an mtime cache
///
/// The store enforces no policy: protected ids, conflicts and existence
/// checks belong to the caller (see [`crate::PromptCatalog`]).
pub struct PromptStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    reads: AtomicU64,
}

impl PromptStore {
    /// Create a store over `dir`. The directory does not need to exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        debug!(?dir, "PromptStore::new: called");
        Self {
            dir,
            cache: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            reads: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the backing file for `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, PROMPT_EXTENSION))
    }

    pub fn is_protected(&self, id: &str) -> bool {
        is_protected(id)
    }

    /// Whether a backing file exists for `id`
    pub fn exists(&self, id: &str) -> bool {
        check_file_id(id).is_ok() && self.path_for(id).is_file()
    }

    /// All prompts in the directory, sorted by case-insensitive title
    ///
    /// A missing directory yields an empty list. Files that cannot be read
    /// are logged and skipped.
    pub fn list(&self) -> Vec<PromptDocument> {
        debug!(dir = ?self.dir, "PromptStore::list: called");
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "Prompts directory does not exist");
            return Vec::new();
        }

        let paths = match self.prompt_files() {
            Ok(paths) => paths,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Failed to read prompts directory");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut prompts = Vec::with_capacity(paths.len());
        for (id, path) in paths {
            seen.insert(id.clone());
            match self.load_cached(&id, &path) {
                Ok(doc) => prompts.push(doc),
                Err(e) => {
                    error!(%id, path = %path.display(), error = %e, "Failed to load prompt file");
                }
            }
        }

        self.lock_cache().retain(|id, _| seen.contains(id));

        // Stable sort keeps filename order for equal titles
        prompts.sort_by_key(|p| p.title.to_lowercase());
        debug!(count = prompts.len(), "PromptStore::list: loaded prompts");
        prompts
    }

    /// Look up a single prompt. `None` when there is no backing file.
    pub fn get_by_id(&self, id: &str) -> Option<PromptDocument> {
        debug!(%id, "PromptStore::get_by_id: called");
        if let Err(e) = check_file_id(id) {
            warn!(%id, error = %e, "Rejected prompt lookup");
            return None;
        }

        let path = self.path_for(id);
        if !path.is_file() {
            warn!(%id, "Prompt not found");
            self.lock_cache().remove(id);
            return None;
        }

        match self.load_cached(id, &path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                error!(%id, path = %path.display(), error = %e, "Error loading prompt");
                None
            }
        }
    }

    /// Create or overwrite `<id>.md` and refresh the cache
    ///
    /// Line breaks in title and description are folded to spaces since
    /// metadata values are single-line.
    pub fn save(&self, id: &str, title: &str, description: &str, content: &str) -> Result<PromptDocument, PromptError> {
        debug!(%id, %title, content_len = content.len(), "PromptStore::save: called");
        check_file_id(id)?;

        let doc = PromptDocument {
            id: id.to_string(),
            title: single_line(title),
            description: single_line(description),
            content: content.trim().to_string(),
        };
        let path = self.path_for(id);
        let io_err = |source| PromptError::Io {
            id: id.to_string(),
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| {
            error!(%id, dir = %self.dir.display(), error = %source, "Failed to create prompts directory");
            io_err(source)
        })?;
        fs::write(&path, doc.to_text()).map_err(|source| {
            error!(%id, path = %path.display(), error = %source, "Failed to write prompt file");
            io_err(source)
        })?;

        match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => {
                self.lock_cache().insert(
                    id.to_string(),
                    CacheEntry {
                        document: doc.clone(),
                        modified,
                    },
                );
            }
            Err(e) => {
                // Next read goes to disk
                warn!(%id, error = %e, "Saved prompt but could not stat it");
                self.lock_cache().remove(id);
            }
        }

        info!(%id, path = %path.display(), "Saved prompt");
        Ok(doc)
    }

    /// Remove `<id>.md` and its cache entry
    pub fn delete(&self, id: &str) -> Result<(), PromptError> {
        debug!(%id, "PromptStore::delete: called");
        check_file_id(id)?;

        let path = self.path_for(id);
        self.lock_cache().remove(id);

        if !path.is_file() {
            debug!(%id, "PromptStore::delete: no backing file");
            return Err(PromptError::NotFound(id.to_string()));
        }

        fs::remove_file(&path).map_err(|source| {
            error!(%id, path = %path.display(), error = %source, "Failed to delete prompt file");
            PromptError::Io {
                id: id.to_string(),
                path: path.clone(),
                source,
            }
        })?;

        info!(%id, "Deleted prompt");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            entries: self.lock_cache().len(),
        }
    }

    /// (id, path) of every `*.md` file, ordered by filename
    fn prompt_files(&self) -> std::io::Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != PROMPT_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => files.push((stem.to_string(), path.clone())),
                None => warn!(path = %path.display(), "Skipping prompt file with non UTF-8 name"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Return the cached document if the mtime still matches, else re-read
    fn load_cached(&self, id: &str, path: &Path) -> std::io::Result<PromptDocument> {
        let modified = fs::metadata(path)?.modified()?;

        if let Some(entry) = self.lock_cache().get(id)
            && entry.modified == modified
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.document.clone());
        }

        debug!(%id, path = %path.display(), "load_cached: reading from disk");
        let text = fs::read_to_string(path)?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let document = PromptDocument::from_text(id, &text);
        self.lock_cache().insert(
            id.to_string(),
            CacheEntry {
                document: document.clone(),
                modified,
            },
        );
        Ok(document)
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // The cache only memoizes disk state, a poisoned map is still usable
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reject ids that cannot name a file directly inside the store directory
fn check_file_id(id: &str) -> Result<(), PromptError> {
    let reason = if id.is_empty() {
        Some("id is empty")
    } else if id.contains(['/', '\\', '\0']) {
        Some("id contains a path separator")
    } else if id.starts_with('.') {
        Some("id starts with a dot")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PromptError::InvalidId {
            id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
