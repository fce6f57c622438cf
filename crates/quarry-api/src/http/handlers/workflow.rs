//! Workflow listing and execution handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use quarry_core::pipeline::{RunOutcome, WorkflowInfo};
use quarry_types::research::ResearchRequest;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/v1/workflows - List registered workflows with their stages.
pub async fn list_workflows(State(state): State<AppState>) -> Json<ApiResponse<Vec<WorkflowInfo>>> {
    let timer = RequestTimer::start();
    let workflows = state.engine.workflows();
    Json(timer.success(workflows).with_link("self", "/api/v1/workflows"))
}

/// POST /api/v1/workflows/run/{workflow_name} - Run a workflow to completion.
///
/// The body is a `ResearchRequest`. The response carries the final state.
/// The run is driven on its own task, so a client that disconnects does not
/// abort it mid-stage.
pub async fn run_workflow(
    State(state): State<AppState>,
    Path(workflow_name): Path<String>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<ApiResponse<RunOutcome>>, AppError> {
    let timer = RequestTimer::start();
    tracing::info!(workflow = %workflow_name, topic = %request.topic, "run requested over HTTP");

    let engine = Arc::clone(&state.engine);
    let outcome = tokio::spawn(async move { engine.execute(&workflow_name, request).await })
        .await??;
    let run_id = outcome.run_id;

    Ok(Json(
        timer
            .success(outcome)
            .with_link("self", format!("/api/v1/runs/{run_id}"))
            .with_link("resume", format!("/api/v1/runs/{run_id}/resume")),
    ))
}
