//! JSON error responses

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use promptstore::PromptError;
use tracing::{debug, error};

use crate::rag::RagError;

/// An error rendered as `{"error": message}` with a status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<PromptError> for ApiError {
    fn from(err: PromptError) -> Self {
        let status = match &err {
            PromptError::NotFound(_) => StatusCode::NOT_FOUND,
            PromptError::Protected(_) => StatusCode::FORBIDDEN,
            PromptError::Conflict(_) => StatusCode::CONFLICT,
            PromptError::Validation(_) | PromptError::InvalidId { .. } => StatusCode::BAD_REQUEST,
            PromptError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if err.is_client_error() {
            debug!(%status, error = %err, "prompt request rejected");
        } else {
            error!(%status, error = %err, "prompt operation failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        if err.is_client_error() {
            debug!(error = %err, "rag request rejected");
            Self::bad_request(err.to_string())
        } else {
            error!(error = %err, "rag operation failed");
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "request body rejected");
        Self::new(rejection.status(), rejection.body_text())
    }
}
