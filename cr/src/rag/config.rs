//! Vector database connection settings and their JSON file store

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

use super::RagError;

pub const DEFAULT_SERVER_HOST: &str = "localhost";
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// How the vector database is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RagMode {
    /// Embedded database in a local directory
    #[default]
    Local,
    /// Self-hosted HTTP server
    Server,
    /// Hosted cloud service
    Cloud,
}

impl RagMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RagMode::Local => "local",
            RagMode::Server => "server",
            RagMode::Cloud => "cloud",
        }
    }
}

impl fmt::Display for RagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RagMode {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(RagMode::Local),
            "server" => Ok(RagMode::Server),
            "cloud" => Ok(RagMode::Cloud),
            other => Err(RagError::validation(format!("Unknown mode: {}", other))),
        }
    }
}

/// Persisted connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagConfig {
    pub mode: RagMode,
    pub local_path: String,
    pub server_host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub server_port: u16,
    pub cloud_tenant: String,
    pub cloud_database: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            mode: RagMode::Local,
            local_path: String::new(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            cloud_tenant: String::new(),
            cloud_database: String::new(),
        }
    }
}

/// A port as sent by a client: JSON number or numeric string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Zero and blank strings count as "not given"
    pub fn is_blank(&self) -> bool {
        match self {
            PortValue::Number(n) => *n == 0,
            PortValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Valid TCP port in 1..=65535
    pub fn to_port(&self) -> Option<u16> {
        let port = match self {
            PortValue::Number(n) => u16::try_from(*n).ok()?,
            PortValue::Text(s) => s.trim().parse::<u16>().ok()?,
        };
        (port > 0).then_some(port)
    }
}

impl From<u16> for PortValue {
    fn from(port: u16) -> Self {
        PortValue::Number(i64::from(port))
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = PortValue::deserialize(deserializer)?;
    value
        .to_port()
        .ok_or_else(|| serde::de::Error::custom(format!("invalid port: {:?}", value)))
}

/// Loosely-typed settings as submitted by a client
///
/// Every field is optional; `validate` applies the per-mode requirements
/// and fills the rest from defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfigInput {
    pub mode: Option<String>,
    pub local_path: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<PortValue>,
    pub cloud_tenant: Option<String>,
    pub cloud_database: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl RagConfigInput {
    /// Requested mode, `local` when absent
    pub fn mode(&self) -> Result<RagMode, RagError> {
        match &self.mode {
            Some(mode) => mode.parse(),
            None => Ok(RagMode::Local),
        }
    }

    pub fn local_path(&self) -> Option<&str> {
        non_empty(&self.local_path)
    }

    pub fn server_host(&self) -> Option<&str> {
        non_empty(&self.server_host)
    }

    pub fn cloud_tenant(&self) -> Option<&str> {
        non_empty(&self.cloud_tenant)
    }

    pub fn cloud_database(&self) -> Option<&str> {
        non_empty(&self.cloud_database)
    }

    /// Port if given, default port if absent or blank
    pub fn port(&self) -> Result<u16, RagError> {
        match &self.server_port {
            Some(value) if !value.is_blank() => value
                .to_port()
                .ok_or_else(|| RagError::validation("Port must be a number between 1 and 65535")),
            _ => Ok(DEFAULT_SERVER_PORT),
        }
    }

    /// Check the fields the chosen mode needs and build the config to persist
    pub fn validate(&self) -> Result<RagConfig, RagError> {
        let mode = self.mode()?;
        match mode {
            RagMode::Local => {
                if self.local_path().is_none() {
                    return Err(RagError::validation("Local path is required for local mode"));
                }
            }
            RagMode::Server => {
                if self.server_host().is_none() {
                    return Err(RagError::validation("Host is required for server mode"));
                }
                if self.server_port.as_ref().is_none_or(PortValue::is_blank) {
                    return Err(RagError::validation("Port is required for server mode"));
                }
            }
            RagMode::Cloud => {
                if self.cloud_tenant().is_none() {
                    return Err(RagError::validation("Tenant ID is required for cloud mode"));
                }
                if self.cloud_database().is_none() {
                    return Err(RagError::validation("Database name is required for cloud mode"));
                }
            }
        }

        Ok(RagConfig {
            mode,
            local_path: self.local_path.clone().unwrap_or_default(),
            server_host: self
                .server_host
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: self.port()?,
            cloud_tenant: self.cloud_tenant.clone().unwrap_or_default(),
            cloud_database: self.cloud_database.clone().unwrap_or_default(),
        })
    }
}

impl From<&RagConfig> for RagConfigInput {
    fn from(config: &RagConfig) -> Self {
        Self {
            mode: Some(config.mode.to_string()),
            local_path: Some(config.local_path.clone()),
            server_host: Some(config.server_host.clone()),
            server_port: Some(config.server_port.into()),
            cloud_tenant: Some(config.cloud_tenant.clone()),
            cloud_database: Some(config.cloud_database.clone()),
        }
    }
}

struct CachedConfig {
    config: RagConfig,
    modified: SystemTime,
}

/// JSON-file backed settings with an mtime cache
pub struct RagConfigStore {
    path: PathBuf,
    cache: Mutex<Option<CachedConfig>>,
}

impl RagConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "RagConfigStore::new: called");
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings; defaults when the file is missing or unreadable
    pub fn get_config(&self) -> RagConfig {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "get_config: no config file, using defaults");
                return RagConfig::default();
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "get_config: failed to stat config file");
                return RagConfig::default();
            }
        };

        if let Some(cached) = self.lock_cache().as_ref()
            && cached.modified == modified
        {
            return cached.config.clone();
        }

        match self.load_file() {
            Ok(config) => {
                debug!(path = %self.path.display(), "get_config: loaded config file");
                *self.lock_cache() = Some(CachedConfig {
                    config: config.clone(),
                    modified,
                });
                config
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "get_config: failed to load RAG config");
                RagConfig::default()
            }
        }
    }

    /// Validate, persist as pretty JSON and drop the cached copy
    pub fn save_config(&self, input: &RagConfigInput) -> Result<RagConfig, RagError> {
        debug!(mode = ?input.mode, "save_config: called");
        let config = input.validate()?;
        let json = serde_json::to_string_pretty(&config)?;

        fs::write(&self.path, json).map_err(|source| {
            error!(path = %self.path.display(), error = %source, "save_config: write failed");
            RagError::Save {
                path: self.path.clone(),
                source,
            }
        })?;

        *self.lock_cache() = None;
        info!(path = %self.path.display(), mode = %config.mode, "Saved RAG config");
        Ok(config)
    }

    fn load_file(&self) -> Result<RagConfig, RagError> {
        let text = fs::read_to_string(&self.path).map_err(|source| RagError::Read {
            path: self.path.clone(),
            source,
        })?;
        merge_with_defaults(serde_json::from_str(&text)?)
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedConfig>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Overlay a loaded JSON object on the default settings
///
/// Keys present in the file win; missing keys come from the defaults and
/// unknown keys are ignored. A null or malformed value only loses its own
/// key, which falls back to the default.
pub fn merge_with_defaults(loaded: serde_json::Value) -> Result<RagConfig, RagError> {
    let serde_json::Value::Object(loaded) = loaded else {
        return Err(RagError::validation("RAG config must be a JSON object"));
    };

    let mut merged = match serde_json::to_value(RagConfig::default())? {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    for (key, value) in loaded {
        if value.is_null() {
            debug!(%key, "merge_with_defaults: null value, keeping default");
            continue;
        }
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        match serde_json::from_value::<RagConfig>(serde_json::Value::Object(candidate.clone())) {
            Ok(_) => merged = candidate,
            Err(e) => warn!(%key, error = %e, "Ignoring invalid RAG config value"),
        }
    }

    Ok(serde_json::from_value(serde_json::Value::Object(merged))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn input(value: serde_json::Value) -> RagConfigInput {
        serde_json::from_value(value).unwrap()
    }

    fn store_in(temp: &TempDir) -> RagConfigStore {
        RagConfigStore::new(temp.path().join("rag_config.json"))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = store_in(&temp).get_config();

        assert_eq!(config, RagConfig::default());
        assert_eq!(config.mode, RagMode::Local);
        assert_eq!(config.server_host, "localhost");
        assert_eq!(config.server_port, 8000);
    }

    #[test]
    fn test_partial_file_merged_over_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(store.path(), r#"{"mode": "server", "server_host": "chroma.lan", "extra": true}"#).unwrap();

        let config = store.get_config();
        assert_eq!(config.mode, RagMode::Server);
        assert_eq!(config.server_host, "chroma.lan");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.local_path, "");
    }

    #[test]
    fn test_bad_values_fall_back_per_key() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(
            store.path(),
            r#"{"mode": "local", "local_path": "/data/chroma", "server_port": null}"#,
        )
        .unwrap();

        let config = store.get_config();
        assert_eq!(config.mode, RagMode::Local);
        assert_eq!(config.local_path, "/data/chroma");
        assert_eq!(config.server_port, DEFAULT_SERVER_PORT);

        let merged = merge_with_defaults(json!({
            "mode": "ftp",
            "server_host": "chroma.lan",
            "server_port": "not-a-port",
            "cloud_tenant": 42,
        }))
        .unwrap();
        assert_eq!(merged.mode, RagMode::Local);
        assert_eq!(merged.server_host, "chroma.lan");
        assert_eq!(merged.server_port, DEFAULT_SERVER_PORT);
        assert_eq!(merged.cloud_tenant, "");
    }

    #[test]
    fn test_string_port_in_file_accepted() {
        let merged = merge_with_defaults(json!({"server_port": "9000"})).unwrap();
        assert_eq!(merged.server_port, 9000);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.get_config(), RagConfig::default());

        fs::write(store.path(), "[1, 2, 3]").unwrap();
        assert_eq!(store.get_config(), RagConfig::default());
    }

    #[test]
    fn test_unchanged_mtime_serves_cached_config() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(store.path(), r#"{"local_path": "/data/one"}"#).unwrap();
        let mtime = fs::metadata(store.path()).unwrap().modified().unwrap();

        assert_eq!(store.get_config().local_path, "/data/one");

        fs::write(store.path(), r#"{"local_path": "/data/two"}"#).unwrap();
        fs::File::options()
            .write(true)
            .open(store.path())
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        assert_eq!(store.get_config().local_path, "/data/one");

        let later = mtime + std::time::Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(store.path())
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert_eq!(store.get_config().local_path, "/data/two");
    }

    #[test]
    fn test_save_writes_pretty_json_and_invalidates_cache() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.get_config().mode, RagMode::Local);

        let saved = store
            .save_config(&input(json!({"mode": "server", "server_host": "10.0.0.5", "server_port": "8001"})))
            .unwrap();
        assert_eq!(saved.server_port, 8001);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("{\n  \"mode\": \"server\""));
        assert!(text.contains("\"server_port\": 8001"));

        let loaded = store.get_config();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_save_validation_messages() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let cases = [
            (json!({}), "Local path is required for local mode"),
            (json!({"mode": "local", "local_path": ""}), "Local path is required for local mode"),
            (json!({"mode": "server", "server_port": 8000}), "Host is required for server mode"),
            (json!({"mode": "server", "server_host": "h"}), "Port is required for server mode"),
            (json!({"mode": "server", "server_host": "h", "server_port": 0}), "Port is required for server mode"),
            (json!({"mode": "server", "server_host": "h", "server_port": "http"}), "Port must be a number between 1 and 65535"),
            (json!({"mode": "server", "server_host": "h", "server_port": 70000}), "Port must be a number between 1 and 65535"),
            (json!({"mode": "cloud", "cloud_database": "db"}), "Tenant ID is required for cloud mode"),
            (json!({"mode": "cloud", "cloud_tenant": "t"}), "Database name is required for cloud mode"),
            (json!({"mode": "hybrid"}), "Unknown mode: hybrid"),
        ];

        for (body, expected) in cases {
            let err = store.save_config(&input(body.clone())).unwrap_err();
            assert_eq!(err.to_string(), expected, "input: {}", body);
        }
        assert!(!store.path().exists());
    }

    #[test]
    fn test_validate_fills_defaults() {
        let config = input(json!({"mode": "cloud", "cloud_tenant": "t", "cloud_database": "d"}))
            .validate()
            .unwrap();
        assert_eq!(
            config,
            RagConfig {
                mode: RagMode::Cloud,
                local_path: String::new(),
                server_host: "localhost".to_string(),
                server_port: 8000,
                cloud_tenant: "t".to_string(),
                cloud_database: "d".to_string(),
            }
        );
    }

    #[test]
    fn test_input_round_trips_from_config() {
        let config = RagConfig {
            mode: RagMode::Server,
            server_host: "db".to_string(),
            server_port: 8123,
            ..RagConfig::default()
        };
        assert_eq!(RagConfigInput::from(&config).validate().unwrap(), config);
    }

    #[test]
    fn test_port_value_parsing() {
        assert_eq!(PortValue::Number(8000).to_port(), Some(8000));
        assert_eq!(PortValue::Text(" 8080 ".to_string()).to_port(), Some(8080));
        assert_eq!(PortValue::Number(-1).to_port(), None);
        assert_eq!(PortValue::Number(0).to_port(), None);
        assert!(PortValue::Text(String::new()).is_blank());
    }
}
