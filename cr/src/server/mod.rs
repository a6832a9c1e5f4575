//! HTTP server
//!
//! Routes:
//!
//! ```text
//! GET    /                         index page
//! GET    /api/health               liveness
//! POST   /api/chat                 streamed plain-text reply
//! GET    /api/prompts              list prompts
//! POST   /api/prompts              create prompt (201)
//! GET    /api/prompts/:id          fetch prompt
//! PUT    /api/prompts/:id          replace prompt fields
//! DELETE /api/prompts/:id          remove prompt
//! GET    /api/rag/config           current vector database settings
//! POST   /api/rag/config           validate and save settings
//! POST   /api/rag/validate-path    check a local database directory
//! POST   /api/rag/test-connection  probe settings without saving
//! GET    /api/rag/api-key-status   whether the cloud key is configured
//! ```

use std::sync::Arc;

use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use eyre::{Context, Result};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::info;

mod chat;
mod error;
mod prompts;
mod rag;
mod request_id;
mod state;

pub use chat::ChatRequest;
pub use error::ApiError;
pub use request_id::{REQUEST_ID_HEADER, RequestId};
pub use state::{AppState, ChatDefaults};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>ChatRag</title>
</head>
<body>
    <h1>ChatRag</h1>
    <p>Chat proxy, prompt templates and vector database settings.</p>
    <ul>
        <li><code>POST /api/chat</code></li>
        <li><code>GET /api/prompts</code></li>
        <li><code>GET /api/rag/config</code></li>
    </ul>
</body>
</html>"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/chat", post(chat::chat))
        .route("/api/prompts", get(prompts::list_prompts).post(prompts::create_prompt))
        .route(
            "/api/prompts/:id",
            get(prompts::get_prompt)
                .put(prompts::update_prompt)
                .delete(prompts::delete_prompt),
        )
        .route("/api/rag/config", get(rag::get_config).post(rag::save_config))
        .route("/api/rag/validate-path", post(rag::validate_path))
        .route("/api/rag/test-connection", post(rag::test_connection))
        .route("/api/rag/api-key-status", get(rag::api_key_status))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id))
        .with_state(state)
}

/// Bind `address` and serve until Ctrl-C
pub async fn serve(address: &str, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .context(format!("Failed to bind {}", address))?;
    info!("Listening on http://{}", listener.local_addr().context("Failed to read local address")?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::Config;
    use crate::llm::LlmClient;
    use tempfile::TempDir;

    /// State rooted in `temp`, with no cloud API key
    pub fn test_state(temp: &TempDir, llm: Arc<dyn LlmClient>) -> Arc<AppState> {
        let mut config = Config::default();
        config.prompts.dir = temp.path().join("prompts");
        config.rag.config_path = temp.path().join("rag_config.json");
        config.rag.api_key_env = "CHATRAG_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        Arc::new(AppState::from_config(&config, llm).unwrap())
    }

    /// Serve the full router on a random port and return its base URL
    pub async fn spawn_app(state: Arc<AppState>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{spawn_app, test_state};
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_health_and_index() {
        let temp = TempDir::new().unwrap();
        let base = spawn_app(test_state(&temp, Arc::new(MockLlmClient::new(&[])))).await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{}/api/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({"status": "ok"}));

        let page = client.get(&base).send().await.unwrap().text().await.unwrap();
        assert!(page.contains("<h1>ChatRag</h1>"));
    }

    #[tokio::test]
    async fn test_request_id_echoed_or_generated() {
        let temp = TempDir::new().unwrap();
        let base = spawn_app(test_state(&temp, Arc::new(MockLlmClient::new(&[])))).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/api/health", base))
            .header(REQUEST_ID_HEADER, "trace-42")
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-42");

        let response = client.get(format!("{}/api/health", base)).send().await.unwrap();
        let generated = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_error() {
        let temp = TempDir::new().unwrap();
        let base = spawn_app(test_state(&temp, Arc::new(MockLlmClient::new(&[])))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/prompts", base))
            .header("content-type", "application/json")
            .body("{broken")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}
