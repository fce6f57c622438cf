//! Run inspection and control handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quarry_core::pipeline::RunOutcome;
use quarry_types::workflow::{Checkpoint, RunRecord};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Query parameters for listing runs.
#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    /// Maximum number of runs to return (default 20).
    #[serde(default = "default_run_limit")]
    pub limit: u32,
}

fn default_run_limit() -> u32 {
    20
}

/// A run with its checkpoints, newest stage last.
#[derive(Debug, Serialize)]
pub struct RunDetail {
    pub run: RunRecord,
    pub checkpoints: Vec<Checkpoint>,
    pub active: bool,
}

/// GET /api/v1/runs - Most recent runs first.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<ApiResponse<Vec<RunRecord>>>, AppError> {
    let timer = RequestTimer::start();
    let runs = state.engine.runs(query.limit).await?;
    Ok(Json(timer.success(runs).with_link("self", "/api/v1/runs")))
}

/// GET /api/v1/runs/{id} - One run and its checkpoints.
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RunDetail>>, AppError> {
    let timer = RequestTimer::start();
    let run = state.engine.run(id).await?;
    let checkpoints = state.engine.checkpoints(id).await?;
    let active = state.engine.active_runs().contains(&id);

    Ok(Json(
        timer
            .success(RunDetail {
                run,
                checkpoints,
                active,
            })
            .with_link("self", format!("/api/v1/runs/{id}")),
    ))
}

/// POST /api/v1/runs/{id}/resume - Continue a run after its last checkpoint.
pub async fn resume_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RunOutcome>>, AppError> {
    let timer = RequestTimer::start();
    let engine = Arc::clone(&state.engine);
    let outcome = tokio::spawn(async move { engine.resume(id).await }).await??;
    Ok(Json(
        timer
            .success(outcome)
            .with_link("self", format!("/api/v1/runs/{id}")),
    ))
}

/// POST /api/v1/runs/{id}/cancel - Stop an executing run at its next stage
/// boundary.
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();

    if !state.engine.cancel(id) {
        // 404 for unknown runs, 409 for runs that exist but are not executing.
        let run = state.engine.run(id).await?;
        return Err(AppError::Conflict(format!(
            "run {id} is not executing (status: {})",
            run.status
        )));
    }

    Ok(Json(
        timer
            .success(serde_json::json!({ "run_id": id, "cancel_requested": true }))
            .with_link("run", format!("/api/v1/runs/{id}")),
    ))
}
