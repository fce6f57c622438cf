//! Durable checkpoint manager for pipeline runs.
//!
//! Wraps `RunRepository` with the operations the engine needs: create a run,
//! write a checkpoint after each stage, mark the final status, and restore
//! the latest state when a run is resumed.

use chrono::Utc;
use uuid::Uuid;

use quarry_types::workflow::{Checkpoint, RunRecord, RunStatus};

use super::state::{ResearchState, StateUpdate};
use crate::repository::run::RunRepository;

// ---------------------------------------------------------------------------
// CheckpointManager
// ---------------------------------------------------------------------------

/// Generic over `R: RunRepository` so it works with any storage backend
/// (SQLite, in-memory mock, etc.). A stage's checkpoint is persisted before
/// the next stage starts.
pub struct CheckpointManager<R: RunRepository> {
    repo: R,
}

impl<R: RunRepository> CheckpointManager<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Run-level
    // -----------------------------------------------------------------------

    pub async fn start_run(&self, run: &RunRecord) -> Result<(), CheckpointError> {
        self.repo
            .create_run(run)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))?;
        tracing::debug!(run_id = %run.id, workflow = %run.workflow, "created run record");
        Ok(())
    }

    pub async fn mark(
        &self,
        run_id: Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> Result<(), CheckpointError> {
        self.repo
            .update_run_status(&run_id, status, error)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))?;
        tracing::debug!(run_id = %run_id, %status, "checkpointed run status");
        Ok(())
    }

    pub async fn load_run(&self, run_id: Uuid) -> Result<RunRecord, CheckpointError> {
        self.repo
            .get_run(&run_id)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))?
            .ok_or(CheckpointError::RunNotFound(run_id))
    }

    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>, CheckpointError> {
        self.repo
            .list_runs(limit)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Stage-level
    // -----------------------------------------------------------------------

    /// Persist the merged state after stage `stage_index` completed.
    pub async fn save(
        &self,
        run_id: Uuid,
        stage_index: u32,
        stage: &str,
        state: &ResearchState,
        update: &StateUpdate,
    ) -> Result<(), CheckpointError> {
        let checkpoint = Checkpoint {
            run_id,
            stage_index,
            stage: stage.to_string(),
            state: serde_json::to_value(state)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?,
            update: serde_json::to_value(update)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?,
            created_at: Utc::now(),
        };

        self.repo
            .save_checkpoint(&checkpoint)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))?;

        tracing::debug!(run_id = %run_id, stage_index, stage, "checkpointed stage");
        Ok(())
    }

    /// Latest state of a run: the index of the last completed stage and the
    /// state saved with it. `None` when no stage has completed yet.
    pub async fn restore(
        &self,
        run_id: Uuid,
    ) -> Result<Option<(u32, ResearchState)>, CheckpointError> {
        let Some(checkpoint) = self
            .repo
            .latest_checkpoint(&run_id)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))?
        else {
            return Ok(None);
        };

        let state: ResearchState = serde_json::from_value(checkpoint.state)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        Ok(Some((checkpoint.stage_index, state)))
    }

    pub async fn checkpoints(&self, run_id: Uuid) -> Result<Vec<Checkpoint>, CheckpointError> {
        self.repo
            .list_checkpoints(&run_id)
            .await
            .map_err(|e| CheckpointError::Repository(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Underlying repository operation failed.
    #[error("checkpoint repository error: {0}")]
    Repository(String),

    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    #[error("checkpoint serialization error: {0}")]
    Serialization(String),
}
