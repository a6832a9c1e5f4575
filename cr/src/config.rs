//! ChatRag configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main ChatRag configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener address
    pub server: ServerConfig,

    /// Upstream chat completion provider
    pub llm: LlmConfig,

    /// Prompt template directory
    pub prompts: PromptsConfig,

    /// Vector database settings file and probes
    pub rag: RagSettings,

    /// Log levels and sinks
    pub log: LogConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the LLM API key environment variable is set. Call this
    /// early in startup to fail fast with a clear error message.
    pub fn validate(&self) -> Result<()> {
        if self.llm.get_api_key().is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: chatrag.yml
        let local_config = PathBuf::from("chatrag.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/chatrag/chatrag.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("chatrag").join("chatrag.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `LOG_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply `LOG_*` overrides using an arbitrary lookup
    ///
    /// Empty values are ignored. Booleans accept `true`/`1`/`yes`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(level) = get("LOG_LEVEL_APP") {
            self.log.level = level;
        }
        if let Some(level) = get("LOG_LEVEL_DEPS") {
            self.log.deps_level = level;
        }
        if let Some(flag) = get("LOG_TO_STDOUT") {
            self.log.stdout = parse_flag(&flag);
        }
        if let Some(flag) = get("LOG_TO_FILE") {
            self.log.to_file = parse_flag(&flag);
        }
        if let Some(path) = get("LOG_FILE_PATH") {
            self.log.file_path = PathBuf::from(path);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Chat completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model used when a chat request names none
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// System prompt used when a chat request names none
    #[serde(rename = "system-prompt")]
    pub system_prompt: String,

    /// Optional cap on response tokens
    #[serde(rename = "max-tokens")]
    pub max_tokens: Option<u32>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-3.5-turbo".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            max_tokens: None,
            timeout_ms: 300_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| eyre::eyre!("Environment variable {} is not set", self.api_key_env))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Prompt template directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(promptstore::DEFAULT_PROMPTS_DIR),
        }
    }
}

/// Vector database settings file and connection probes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// JSON file holding the connection settings
    #[serde(rename = "config-path")]
    pub config_path: PathBuf,

    /// Environment variable containing the cloud API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Base URL of the hosted vector database API
    #[serde(rename = "cloud-url")]
    pub cloud_url: String,

    /// Timeout for connectivity probes in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("rag_config.json"),
            api_key_env: "CHROMADB_API_KEY".to_string(),
            cloud_url: "https://api.trychroma.com".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl RagSettings {
    /// Cloud API key, if the variable is set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for this application's crates
    pub level: String,

    /// Level for everything else
    #[serde(rename = "deps-level")]
    pub deps_level: String,

    /// Write log lines to stdout
    pub stdout: bool,

    /// Write log lines to `file-path`
    #[serde(rename = "to-file")]
    pub to_file: bool,

    #[serde(rename = "file-path")]
    pub file_path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            deps_level: "info".to_string(),
            stdout: true,
            to_file: true,
            file_path: PathBuf::from("app.log"),
        }
    }
}

impl LogConfig {
    /// Filter directives: deps level globally, app level for our crates
    pub fn directives(&self) -> String {
        let app = normalize_level(&self.level);
        let deps = normalize_level(&self.deps_level);
        format!("{deps},chatrag={app},promptstore={app}")
    }
}

/// Map a level name to a filter directive, falling back to `info`
fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.address(), "127.0.0.1:5000");
        assert_eq!(config.llm.model, "openai/gpt-3.5-turbo");
        assert_eq!(config.llm.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.llm.system_prompt, "You are a helpful assistant.");
        assert_eq!(config.prompts.dir, PathBuf::from("prompts"));
        assert_eq!(config.rag.config_path, PathBuf::from("rag_config.json"));
        assert!(config.log.stdout);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
server:
  port: 8080
llm:
  model: anthropic/claude-3-haiku
  max-tokens: 512
rag:
  config-path: /tmp/rag.json
log:
  deps-level: warn
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.model, "anthropic/claude-3-haiku");
        assert_eq!(config.llm.max_tokens, Some(512));
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.rag.config_path, PathBuf::from("/tmp/rag.json"));
        assert_eq!(config.rag.api_key_env, "CHROMADB_API_KEY");
        assert_eq!(config.log.deps_level, "warn");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chatrag.yml");
        fs::write(&path, "prompts:\n  dir: /srv/prompts\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.prompts.dir, PathBuf::from("/srv/prompts"));
    }

    #[test]
    fn test_load_explicit_path_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LOG_LEVEL_APP", "WARNING"),
            ("LOG_LEVEL_DEPS", "ERROR"),
            ("LOG_TO_STDOUT", "false"),
            ("LOG_TO_FILE", "1"),
            ("LOG_FILE_PATH", "/var/log/chatrag.log"),
        ]);

        let mut config = Config::default();
        config.log.to_file = false;
        config.apply_env_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.log.level, "WARNING");
        assert_eq!(config.log.deps_level, "ERROR");
        assert!(!config.log.stdout);
        assert!(config.log.to_file);
        assert_eq!(config.log.file_path, PathBuf::from("/var/log/chatrag.log"));
        assert_eq!(config.log.directives(), "error,chatrag=warn,promptstore=warn");
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env_with(|key| (key == "LOG_LEVEL_APP").then(|| "  ".to_string()));
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let log = LogConfig {
            level: "chatty".to_string(),
            ..LogConfig::default()
        };
        assert_eq!(log.directives(), "info,chatrag=info,promptstore=info");
    }

    #[test]
    fn test_missing_api_key_env_fails_validation() {
        let mut config = Config::default();
        config.llm.api_key_env = "CHATRAG_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(config.validate().is_err());
    }
}
