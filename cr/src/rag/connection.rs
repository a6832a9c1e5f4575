//! Connectivity probes for the vector database and API key status

use reqwest::{Client, Url};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

use super::config::DEFAULT_SERVER_HOST;
use super::{RagConfigInput, RagError, RagMode};
use crate::config::RagSettings;

/// SQLite file an embedded database keeps in its directory
const LOCAL_DB_FILE: &str = "chroma.sqlite3";

const DEFAULT_TENANT: &str = "default_tenant";
const DEFAULT_DATABASE: &str = "default_database";

/// Header carrying the cloud API key
const TOKEN_HEADER: &str = "x-chroma-token";

/// Result of a connection test; failures are reports, not errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
}

impl ConnectionReport {
    fn connected(message: String, collections: Vec<String>) -> Self {
        Self {
            success: true,
            message,
            collections: Some(collections),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            collections: None,
        }
    }
}

/// Whether the cloud API key is set, with a display-safe form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyStatus {
    pub configured: bool,
    pub masked: Option<String>,
}

/// Show the first and last four characters of keys longer than eight
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    name: String,
}

/// Probes a local, self-hosted or cloud vector database
pub struct ChromaProbe {
    http: Client,
    cloud_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl ChromaProbe {
    pub fn new(
        cloud_url: impl Into<String>,
        api_key: Option<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            cloud_url: cloud_url.into().trim_end_matches('/').to_string(),
            api_key,
            api_key_env: api_key_env.into(),
        })
    }

    pub fn from_settings(settings: &RagSettings) -> Result<Self, RagError> {
        Self::new(
            &settings.cloud_url,
            settings.api_key(),
            &settings.api_key_env,
            settings.timeout(),
        )
    }

    pub fn api_key_status(&self) -> ApiKeyStatus {
        match &self.api_key {
            Some(key) => ApiKeyStatus {
                configured: true,
                masked: Some(mask_api_key(key)),
            },
            None => ApiKeyStatus {
                configured: false,
                masked: None,
            },
        }
    }

    /// Try to reach the database described by `input` and list its collections
    pub async fn test_connection(&self, input: &RagConfigInput) -> ConnectionReport {
        let mode = match input.mode() {
            Ok(mode) => mode,
            Err(e) => return ConnectionReport::failed(e.to_string()),
        };
        debug!(%mode, "test_connection: called");

        let result = match mode {
            RagMode::Local => self.test_local(input).await,
            RagMode::Server => self.test_server(input).await,
            RagMode::Cloud => self.test_cloud(input).await,
        };

        result.unwrap_or_else(|e| {
            error!(%mode, error = %e, "Connection test failed");
            ConnectionReport::failed(e.to_string())
        })
    }

    async fn test_local(&self, input: &RagConfigInput) -> Result<ConnectionReport, RagError> {
        let Some(path) = input.local_path() else {
            return Ok(ConnectionReport::failed("Local path is required"));
        };

        let dir = PathBuf::from(path);
        let collections = tokio::task::spawn_blocking(move || list_local_collections(&dir))
            .await
            .map_err(|e| RagError::Probe(e.to_string()))??;

        info!(%path, "Local connection successful");
        Ok(ConnectionReport::connected(
            format!("Connected to local ChromaDB at {}", path),
            collections,
        ))
    }

    async fn test_server(&self, input: &RagConfigInput) -> Result<ConnectionReport, RagError> {
        let host = input.server_host().unwrap_or(DEFAULT_SERVER_HOST);
        let port = input.port()?;
        let base = server_base_url(host, port)?;

        self.http
            .get(endpoint(&base, &["api", "v2", "heartbeat"])?)
            .send()
            .await?
            .error_for_status()?;

        let url = collections_url(&base, DEFAULT_TENANT, DEFAULT_DATABASE)?;
        let collections = self.fetch_collections(url, None).await?;

        info!(%host, %port, "Server connection successful");
        Ok(ConnectionReport::connected(
            format!("Connected to ChromaDB server at {}:{}", host, port),
            collections,
        ))
    }

    async fn test_cloud(&self, input: &RagConfigInput) -> Result<ConnectionReport, RagError> {
        let Some(tenant) = input.cloud_tenant() else {
            return Ok(ConnectionReport::failed("Tenant ID is required"));
        };
        let Some(database) = input.cloud_database() else {
            return Ok(ConnectionReport::failed("Database name is required"));
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ConnectionReport::failed(format!(
                "{} not configured in .env",
                self.api_key_env
            )));
        };

        let base = Url::parse(&self.cloud_url)
            .map_err(|e| RagError::Probe(format!("Invalid cloud URL '{}': {}", self.cloud_url, e)))?;
        let url = collections_url(&base, tenant, database)?;
        let collections = self.fetch_collections(url, Some(api_key)).await?;

        info!(%tenant, %database, "Cloud connection successful");
        Ok(ConnectionReport::connected(
            format!("Connected to ChromaDB Cloud ({}/{})", tenant, database),
            collections,
        ))
    }

    async fn fetch_collections(&self, url: Url, token: Option<&str>) -> Result<Vec<String>, RagError> {
        debug!(%url, "fetch_collections: called");
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }

        let collections: Vec<CollectionInfo> = request.send().await?.error_for_status()?.json().await?;
        Ok(collections.into_iter().map(|c| c.name).collect())
    }
}

/// `http://host:port/` for a self-hosted server; rejects hosts that are not hosts
fn server_base_url(host: &str, port: u16) -> Result<Url, RagError> {
    let mut url = Url::parse("http://localhost/").map_err(|e| RagError::Probe(e.to_string()))?;
    url.set_host(Some(host))
        .map_err(|e| RagError::validation(format!("Invalid host '{}': {}", host, e)))?;
    url.set_port(Some(port))
        .map_err(|_| RagError::validation(format!("Invalid port: {}", port)))?;
    Ok(url)
}

/// Append `segments` to `base`, escaping each one as a single path segment
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, RagError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RagError::Probe(format!("Cannot build a request path on {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn collections_url(base: &Url, tenant: &str, database: &str) -> Result<Url, RagError> {
    endpoint(
        base,
        &["api", "v2", "tenants", tenant, "databases", database, "collections"],
    )
}

/// Create the directory if needed and read collection names from its SQLite file
fn list_local_collections(dir: &Path) -> Result<Vec<String>, RagError> {
    fs::create_dir_all(dir).map_err(|e| RagError::Probe(format!("Failed to create {}: {}", dir.display(), e)))?;

    let db_path = dir.join(LOCAL_DB_FILE);
    if !db_path.exists() {
        debug!(path = %dir.display(), "list_local_collections: no database file yet");
        return Ok(Vec::new());
    }

    let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}
