//! Prompt template endpoints

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use promptstore::{PromptDocument, PromptInput};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{ApiError, AppState};

/// Body of `POST /api/prompts`: the new id plus the editable fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePrompt {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub input: PromptInput,
}

pub async fn list_prompts(State(state): State<Arc<AppState>>) -> Json<Vec<PromptDocument>> {
    let prompts = state.prompts.list();
    debug!(count = prompts.len(), "list_prompts: called");
    Json(prompts)
}

pub async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PromptDocument>, ApiError> {
    debug!(%id, "get_prompt: called");
    Ok(Json(state.prompts.get(&id)?))
}

pub async fn create_prompt(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePrompt>, JsonRejection>,
) -> Result<(StatusCode, Json<PromptDocument>), ApiError> {
    let Json(body) = payload?;
    let prompt = state.prompts.create(&body.id, &body.input)?;
    info!(id = %prompt.id, "Created prompt");
    Ok((StatusCode::CREATED, Json(prompt)))
}

pub async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PromptInput>, JsonRejection>,
) -> Result<Json<PromptDocument>, ApiError> {
    let Json(input) = payload?;
    let prompt = state.prompts.update(&id, &input)?;
    info!(%id, "Updated prompt");
    Ok(Json(prompt))
}

pub async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.prompts.delete(&id)?;
    info!(%id, "Deleted prompt");
    Ok(Json(json!({ "success": true, "id": id })))
}
