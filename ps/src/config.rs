//! Configuration for the promptstore CLI

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the `<id>.md` prompt files
    #[serde(default = "default_prompts_dir", rename = "prompts-dir")]
    pub prompts_dir: PathBuf,
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from(crate::DEFAULT_PROMPTS_DIR)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }

        // Try default locations
        let default_paths = [
            Some(PathBuf::from("promptstore.yml")),
            dirs::config_dir().map(|p| p.join("promptstore").join("config.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).context(format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        assert_eq!(Config::default().prompts_dir, PathBuf::from("prompts"));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ps.yml");
        std::fs::write(&path, "prompts-dir: /srv/prompts\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.prompts_dir, PathBuf::from("/srv/prompts"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ps.yml");
        std::fs::write(&path, "{}\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.prompts_dir, PathBuf::from("prompts"));
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(&temp.path().join("missing.yml"))).is_err());
    }
}
