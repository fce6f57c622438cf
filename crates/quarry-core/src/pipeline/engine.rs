//! Pipeline engine: sequential stage execution with durable checkpointing.
//!
//! # Execution flow
//!
//! 1. Look up the workflow and validate the request into a `ResearchContext`.
//! 2. Load the memory snapshot and build the initial `ResearchState`.
//! 3. Create the `RunRecord` (status `running`).
//! 4. For each stage: check cancellation, run the stage (retrying transient
//!    errors), merge its update, write the checkpoint.
//! 5. Mark the run `completed`, `failed` or `cancelled`.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use quarry_types::error::ValidationError;
use quarry_types::research::ResearchRequest;
use quarry_types::workflow::{Checkpoint, RunRecord, RunStatus};

use super::checkpoint::{CheckpointError, CheckpointManager};
use super::context::ResearchContext;
use super::graph::{GraphError, WorkflowGraph};
use super::registry::{RegistryError, WorkflowRegistry};
use super::retry::RetryPolicy;
use super::stage::{StageError, StageInput, StageTools};
use super::state::ResearchState;
use crate::repository::run::RunRepository;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Result of a run that reached its end.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub state: ResearchState,
}

/// A registered workflow and its stages in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowInfo {
    pub name: String,
    pub stages: Vec<String>,
}

// ---------------------------------------------------------------------------
// PipelineEngine
// ---------------------------------------------------------------------------

/// Runs named workflows over shared state.
///
/// Generic over `R: RunRepository` for storage flexibility. Different runs
/// may execute concurrently on one engine; the stages of a single run are
/// strictly sequential.
pub struct PipelineEngine<R: RunRepository> {
    registry: WorkflowRegistry,
    checkpoints: CheckpointManager<R>,
    tools: StageTools,
    retry: RetryPolicy,
    /// Cancellation tokens keyed by run_id, present while a run executes.
    active: DashMap<Uuid, CancellationToken>,
}

impl<R: RunRepository> PipelineEngine<R> {
    pub fn new(registry: WorkflowRegistry, repo: R, tools: StageTools, retry: RetryPolicy) -> Self {
        Self {
            registry,
            checkpoints: CheckpointManager::new(repo),
            tools,
            retry,
            active: DashMap::new(),
        }
    }

    /// Registered workflows, sorted by name.
    pub fn workflows(&self) -> Vec<WorkflowInfo> {
        self.registry
            .iter()
            .map(|(name, graph)| WorkflowInfo {
                name: name.to_string(),
                stages: graph.stage_names().into_iter().map(str::to_string).collect(),
            })
            .collect()
    }

    /// Ids of runs currently executing on this engine.
    pub fn active_runs(&self) -> Vec<Uuid> {
        self.active.iter().map(|entry| *entry.key()).collect()
    }

    pub fn tools(&self) -> &StageTools {
        &self.tools
    }

    /// Mark `run_id` as executing on this engine.
    ///
    /// The slot is released when the returned guard drops, including when the
    /// run's future is dropped mid-stage.
    fn claim(&self, run_id: Uuid) -> Result<ActiveRun<'_>, EngineError> {
        match self.active.entry(run_id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyActive(run_id)),
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(token.clone());
                Ok(ActiveRun {
                    active: &self.active,
                    run_id,
                    token,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    /// Start a new run of `workflow` for `request` and drive it to the end.
    pub async fn execute(
        &self,
        workflow: &str,
        request: ResearchRequest,
    ) -> Result<RunOutcome, EngineError> {
        let graph = self.registry.lookup(workflow)?;
        let workflow = workflow.trim().to_lowercase();
        let run_id = Uuid::now_v7();
        let context = ResearchContext::from_request(&workflow, run_id, &request)?;
        let active = self.claim(run_id)?;

        let memories = self.tools.artifacts.load_memories().await;
        tracing::debug!(run_id = %run_id, memories = memories.len(), "loaded memory snapshot");
        let state = ResearchState::initial(&workflow, &request, memories);

        let record = RunRecord {
            id: run_id,
            workflow: workflow.clone(),
            request: serde_json::to_value(&request)
                .map_err(|e| EngineError::InvalidRunRequest(e.to_string()))?,
            status: RunStatus::Running,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            last_stage_index: None,
        };
        self.checkpoints.start_run(&record).await?;

        tracing::info!(
            run_id = %run_id,
            workflow = %workflow,
            topic = %state.topic,
            "run started"
        );

        self.drive(&graph, context, state, 0, active).await
    }

    /// Continue a run after its last checkpoint.
    ///
    /// A completed run returns its final state without executing anything.
    /// Without any checkpoint the run restarts from the initial state.
    /// A run whose previous driver was dropped mid-stage is still `running`
    /// in storage and resumes like a failed one.
    pub async fn resume(&self, run_id: Uuid) -> Result<RunOutcome, EngineError> {
        let active = self.claim(run_id)?;

        let run = self.checkpoints.load_run(run_id).await.map_err(|e| match e {
            CheckpointError::RunNotFound(id) => EngineError::RunNotFound(id),
            other => EngineError::Checkpoint(other),
        })?;
        let request: ResearchRequest = serde_json::from_value(run.request.clone())
            .map_err(|e| EngineError::InvalidRunRequest(e.to_string()))?;

        let restored = self.checkpoints.restore(run_id).await?;

        if run.status.is_finished() {
            let state = match restored {
                Some((_, state)) => state,
                None => ResearchState::initial(&run.workflow, &request, Vec::new()),
            };
            tracing::info!(run_id = %run_id, "run already completed, nothing to resume");
            return Ok(RunOutcome {
                run_id,
                status: run.status,
                state,
            });
        }

        let graph = self.registry.lookup(&run.workflow)?;
        let context = ResearchContext::from_request(&run.workflow, run_id, &request)?;

        let (next_index, state) = match restored {
            Some((index, state)) => (index as usize + 1, state),
            None => {
                let memories = self.tools.artifacts.load_memories().await;
                (0, ResearchState::initial(&run.workflow, &request, memories))
            }
        };

        self.checkpoints.mark(run_id, RunStatus::Running, None).await?;
        tracing::info!(
            run_id = %run_id,
            workflow = %run.workflow,
            next_stage = next_index,
            "resuming run"
        );

        self.drive(&graph, context, state, next_index, active).await
    }

    /// Request cancellation of an active run. Takes effect at the next stage
    /// boundary. Returns `false` when the run is not executing here.
    pub fn cancel(&self, run_id: Uuid) -> bool {
        match self.active.get(&run_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(run_id = %run_id, "cancellation requested");
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub async fn runs(&self, limit: u32) -> Result<Vec<RunRecord>, EngineError> {
        Ok(self.checkpoints.list_runs(limit).await?)
    }

    pub async fn run(&self, run_id: Uuid) -> Result<RunRecord, EngineError> {
        self.checkpoints.load_run(run_id).await.map_err(|e| match e {
            CheckpointError::RunNotFound(id) => EngineError::RunNotFound(id),
            other => EngineError::Checkpoint(other),
        })
    }

    pub async fn checkpoints(&self, run_id: Uuid) -> Result<Vec<Checkpoint>, EngineError> {
        Ok(self.checkpoints.checkpoints(run_id).await?)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    async fn drive(
        &self,
        graph: &WorkflowGraph,
        context: ResearchContext,
        state: ResearchState,
        start_index: usize,
        active: ActiveRun<'_>,
    ) -> Result<RunOutcome, EngineError> {
        debug_assert_eq!(active.run_id, context.run_id());
        self.run_stages(graph, Arc::new(context), state, start_index, &active.token)
            .await
    }

    async fn run_stages(
        &self,
        graph: &WorkflowGraph,
        context: Arc<ResearchContext>,
        mut state: ResearchState,
        start_index: usize,
        token: &CancellationToken,
    ) -> Result<RunOutcome, EngineError> {
        let run_id = context.run_id();

        for (index, stage) in graph.stages().iter().enumerate().skip(start_index) {
            if token.is_cancelled() {
                self.finish(run_id, RunStatus::Cancelled, None).await;
                tracing::info!(run_id = %run_id, stage_index = index, "run cancelled");
                return Err(EngineError::Cancelled {
                    run_id,
                    stage_index: index,
                });
            }

            tracing::debug!(run_id = %run_id, stage = stage.name(), index, "stage starting");
            let input = StageInput {
                state: &state,
                context: &context,
                tools: &self.tools,
            };
            let result = self
                .retry
                .run(|_| stage.run(input), StageError::is_transient)
                .await;

            let update = match result {
                Ok(update) => update,
                Err(error) => {
                    tracing::error!(
                        run_id = %run_id,
                        stage = stage.name(),
                        index,
                        error = %error,
                        "stage failed"
                    );
                    self.finish(run_id, RunStatus::Failed, Some(&error.to_string()))
                        .await;
                    return Err(EngineError::StageFailed {
                        run_id,
                        stage: stage.name().to_string(),
                        index,
                        error,
                    });
                }
            };

            state.apply(update.clone());
            if let Err(error) = self
                .checkpoints
                .save(run_id, index as u32, stage.name(), &state, &update)
                .await
            {
                tracing::error!(
                    run_id = %run_id,
                    stage = stage.name(),
                    index,
                    error = %error,
                    "checkpoint write failed"
                );
                self.finish(run_id, RunStatus::Failed, Some(&error.to_string()))
                    .await;
                return Err(error.into());
            }
            tracing::info!(run_id = %run_id, stage = stage.name(), index, "stage completed");
        }

        self.finish(run_id, RunStatus::Completed, None).await;
        tracing::info!(run_id = %run_id, "run completed");

        Ok(RunOutcome {
            run_id,
            status: RunStatus::Completed,
            state,
        })
    }

    /// Record a terminal status. A failure to record is logged; the run's
    /// own outcome is what the caller needs to see.
    async fn finish(&self, run_id: Uuid, status: RunStatus, error: Option<&str>) {
        if let Err(e) = self.checkpoints.mark(run_id, status, error).await {
            tracing::warn!(run_id = %run_id, %status, error = %e, "failed to record run status");
        }
    }
}

// ---------------------------------------------------------------------------
// Active run guard
// ---------------------------------------------------------------------------

/// Holds a run's slot in the active map; removes it on drop.
struct ActiveRun<'a> {
    active: &'a DashMap<Uuid, CancellationToken>,
    run_id: Uuid,
    token: CancellationToken,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.run_id);
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid workflow graph: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("stage '{stage}' (#{index}) failed: {error}")]
    StageFailed {
        run_id: Uuid,
        stage: String,
        index: usize,
        #[source]
        error: StageError,
    },

    #[error("run {run_id} cancelled before stage #{stage_index}")]
    Cancelled { run_id: Uuid, stage_index: usize },

    #[error("run not found: {0}")]
    RunNotFound(Uuid),

    #[error("run is already executing: {0}")]
    AlreadyActive(Uuid),

    #[error("stored run request is invalid: {0}")]
    InvalidRunRequest(String),
}

impl EngineError {
    /// Run id of a run that started but did not complete.
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            EngineError::StageFailed { run_id, .. } | EngineError::Cancelled { run_id, .. } => {
                Some(*run_id)
            }
            _ => None,
        }
    }
}
