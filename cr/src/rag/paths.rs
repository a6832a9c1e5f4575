//! Checks that a directory can hold an embedded vector database

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Probe file created and removed to test write access
const WRITE_TEST_FILE: &str = ".chroma_write_test";

/// Outcome of checking a candidate local database directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathValidation {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PathDetails>,
}

/// Facts gathered along the way; only the ones checked are reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathDetails {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub will_create: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
}

impl PathValidation {
    fn new(valid: bool, message: &str, details: Option<PathDetails>) -> Self {
        Self {
            valid,
            message: message.to_string(),
            details,
        }
    }
}

/// Validate that `path` is, or can become, a writable directory
pub fn validate_local_path(path: &str) -> PathValidation {
    debug!(%path, "validate_local_path: called");
    if path.trim().is_empty() {
        return PathValidation::new(false, "Path is required", None);
    }

    let path = Path::new(path);

    if !path.exists() {
        let parent_exists = path.parent().is_some_and(|p| p.as_os_str().is_empty() || p.exists());
        if parent_exists {
            return PathValidation::new(
                true,
                "Directory will be created",
                Some(PathDetails {
                    exists: false,
                    will_create: Some(true),
                    ..PathDetails::default()
                }),
            );
        }
        return PathValidation::new(
            false,
            "Parent directory does not exist",
            Some(PathDetails {
                exists: false,
                parent_exists: Some(false),
                ..PathDetails::default()
            }),
        );
    }

    if !path.is_dir() {
        return PathValidation::new(
            false,
            "Path is not a directory",
            Some(PathDetails {
                exists: true,
                is_directory: Some(false),
                ..PathDetails::default()
            }),
        );
    }

    if !is_writable(path) {
        return PathValidation::new(
            false,
            "Directory is not writable",
            Some(PathDetails {
                exists: true,
                is_directory: Some(true),
                writable: Some(false),
                ..PathDetails::default()
            }),
        );
    }

    debug!(path = %path.display(), "validate_local_path: valid");
    PathValidation::new(
        true,
        "Valid directory",
        Some(PathDetails {
            exists: true,
            is_directory: Some(true),
            writable: Some(true),
            ..PathDetails::default()
        }),
    )
}

fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(WRITE_TEST_FILE);
    match fs::OpenOptions::new().create(true).append(true).open(&probe) {
        Ok(_) => fs::remove_file(&probe).is_ok(),
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "is_writable: probe failed");
            false
        }
    }
}
