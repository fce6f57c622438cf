//! Stage trait, the tools a stage may use, and stage errors.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use quarry_types::config::LlmConfig;
use quarry_types::llm::{CompletionRequest, LlmError, Message};

use super::context::ResearchContext;
use super::state::{ResearchState, StateUpdate};
use crate::llm::BoxLlmProvider;
use crate::llm::structured::{parse_output, response_format};
use crate::memory::{ArtifactError, BoxArtifactStore};
use crate::search::{SearchAggregator, SeedFetcher};
use crate::stages::prompts::AgentPrompts;

// ---------------------------------------------------------------------------
// StageError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    /// The model answered, but not in the requested shape.
    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("artifact write failed: {0}")]
    Artifact(#[from] ArtifactError),
}

impl StageError {
    /// Only model rate limits, overloads, timeouts and 5xx are retried.
    pub fn is_transient(&self) -> bool {
        match self {
            StageError::Model(err) => err.is_transient(),
            StageError::InvalidOutput(_) | StageError::Artifact(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Shared services handed to every stage.
#[derive(Clone)]
pub struct StageTools {
    pub aggregator: Arc<SearchAggregator>,
    pub artifacts: Arc<BoxArtifactStore>,
    pub fetcher: Arc<SeedFetcher>,
    pub llm: Arc<BoxLlmProvider>,
    /// Configured model defaults; per-run settings override them.
    pub llm_defaults: LlmConfig,
    pub prompts: Arc<AgentPrompts>,
}

impl StageTools {
    /// Build a completion request with the run's model overrides applied.
    pub fn completion_request(
        &self,
        context: &ResearchContext,
        system: &str,
        user: String,
    ) -> CompletionRequest {
        let overrides = context.llm();
        CompletionRequest {
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| self.llm_defaults.model.clone()),
            messages: vec![Message::user(user)],
            system: Some(system.to_string()),
            max_tokens: self.llm_defaults.max_tokens,
            temperature: overrides.temperature.or(self.llm_defaults.temperature),
            base_url: overrides.base_url.clone(),
            response_format: None,
        }
    }

    /// Ask the model for a `T`, constrained by `T`'s JSON schema.
    pub async fn structured<T>(
        &self,
        context: &ResearchContext,
        system: &str,
        user: String,
        schema_name: &str,
    ) -> Result<T, StageError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let mut request = self.completion_request(context, system, user);
        request.response_format = Some(response_format::<T>(schema_name));

        let response = self.llm.complete(&request).await?;
        tracing::debug!(
            run_id = %context.run_id(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            schema = schema_name,
            "model call completed"
        );

        parse_output::<T>(&response.content)
            .map_err(|e| StageError::InvalidOutput(format!("{schema_name}: {e}")))
    }
}

impl std::fmt::Debug for StageTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTools")
            .field("llm", &self.llm.name())
            .field("model", &self.llm_defaults.model)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// What a stage sees: the current state (read-only), the frozen context,
/// and the shared tools.
#[derive(Clone, Copy)]
pub struct StageInput<'a> {
    pub state: &'a ResearchState,
    pub context: &'a ResearchContext,
    pub tools: &'a StageTools,
}

/// One step of a workflow.
///
/// A stage is a function of its input: it returns a `StateUpdate` and the
/// engine does the merging. Running a stage twice on the same input must
/// produce an equivalent update, which is what makes stage retry safe.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn run<'a>(
        &'a self,
        input: StageInput<'a>,
    ) -> impl std::future::Future<Output = Result<StateUpdate, StageError>> + Send + 'a;
}

/// Object-safe version of [`Stage`].
pub trait StageDyn: Send + Sync {
    fn name(&self) -> &str;

    fn run_boxed<'a>(&'a self, input: StageInput<'a>) -> BoxFuture<'a, Result<StateUpdate, StageError>>;
}

impl<T: Stage> StageDyn for T {
    fn name(&self) -> &str {
        Stage::name(self)
    }

    fn run_boxed<'a>(&'a self, input: StageInput<'a>) -> BoxFuture<'a, Result<StateUpdate, StageError>> {
        Box::pin(self.run(input))
    }
}

/// Type-erased stage, as stored in a workflow graph.
pub struct BoxStage {
    inner: Box<dyn StageDyn>,
}

impl BoxStage {
    pub fn new<T: Stage + 'static>(stage: T) -> Self {
        Self {
            inner: Box::new(stage),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn run(&self, input: StageInput<'_>) -> Result<StateUpdate, StageError> {
        self.inner.run_boxed(input).await
    }
}

impl std::fmt::Debug for BoxStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxStage").field(&self.name()).finish()
    }
}
