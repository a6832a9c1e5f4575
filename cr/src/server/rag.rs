//! Vector database settings endpoints

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiError, AppState};
use crate::rag::{ApiKeyStatus, ConnectionReport, PathValidation, RagConfig, RagConfigInput, validate_local_path};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathRequest {
    pub path: String,
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<RagConfig> {
    Json(state.rag.get_config())
}

pub async fn save_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RagConfigInput>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(input) = payload?;
    let config = state.rag.save_config(&input)?;
    Ok(Json(json!({ "success": true, "config": config })))
}

pub async fn validate_path(payload: Result<Json<PathRequest>, JsonRejection>) -> Result<Json<PathValidation>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(validate_local_path(&req.path)))
}

pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RagConfigInput>, JsonRejection>,
) -> Result<Json<ConnectionReport>, ApiError> {
    let Json(input) = payload?;
    Ok(Json(state.probe.test_connection(&input).await))
}

pub async fn api_key_status(State(state): State<Arc<AppState>>) -> Json<ApiKeyStatus> {
    Json(state.probe.api_key_status())
}
