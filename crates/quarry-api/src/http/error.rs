//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use quarry_core::pipeline::{CheckpointError, EngineError, RegistryError};

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Engine(EngineError),
    Conflict(String),
    /// The task driving a run panicked or was aborted.
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("run task failed: {e}"))
    }
}

impl AppError {
    /// Status, machine-readable code and optional details for this error.
    fn classify(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::Engine(err) => match err {
                EngineError::Registry(RegistryError::NotFound { available, .. }) => (
                    StatusCode::NOT_FOUND,
                    "WORKFLOW_NOT_FOUND",
                    Some(json!({ "available": available })),
                ),
                EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
                EngineError::RunNotFound(_)
                | EngineError::Checkpoint(CheckpointError::RunNotFound(_)) => {
                    (StatusCode::NOT_FOUND, "RUN_NOT_FOUND", None)
                }
                EngineError::AlreadyActive(run_id) => (
                    StatusCode::CONFLICT,
                    "RUN_ACTIVE",
                    Some(json!({ "run_id": run_id })),
                ),
                EngineError::Cancelled { run_id, stage_index } => (
                    StatusCode::CONFLICT,
                    "RUN_CANCELLED",
                    Some(json!({ "run_id": run_id, "stage_index": stage_index })),
                ),
                EngineError::StageFailed {
                    run_id,
                    stage,
                    index,
                    ..
                } => (
                    StatusCode::BAD_GATEWAY,
                    "STAGE_FAILED",
                    Some(json!({ "run_id": run_id, "stage": stage, "stage_index": index })),
                ),
                EngineError::Registry(_)
                | EngineError::Graph(_)
                | EngineError::Checkpoint(_)
                | EngineError::InvalidRunRequest(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None)
                }
            },
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Engine(err) => err.to_string(),
            AppError::Conflict(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.classify();
        if status.is_server_error() {
            tracing::error!(code, error = %self.message(), "request failed");
        }
        let body = ApiResponse::error(code, self.message(), details);
        (status, Json(body)).into_response()
    }
}
