//! In-memory stubs for the core ports, used by unit tests across the crate.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use quarry_types::config::LlmConfig;
use quarry_types::error::RepositoryError;
use quarry_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};
use quarry_types::note::AtomicNote;
use quarry_types::search::{ProviderError, SearchCapabilities, SearchMode};
use quarry_types::source::SourceRecord;
use quarry_types::workflow::{Checkpoint, RunRecord, RunStatus};

use crate::llm::{BoxLlmProvider, LlmProvider};
use crate::memory::store::ArtifactStore;
use crate::memory::{
    ArtifactError, BoxArtifactStore, RunArtifacts, render_atomic_note, render_memory_document,
    render_sources_csv, slug,
};
use crate::pipeline::stage::{Stage, StageError, StageInput, StageTools};
use crate::pipeline::state::{LogEntry, LogRole, StateUpdate};
use crate::repository::run::RunRepository;
use crate::search::{
    BoxPageFetcher, PageFetcher, ProviderRegistry, SearchAggregator, SearchProvider, SeedFetcher,
};
use crate::stages::prompts::AgentPrompts;

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Stage tools with no search providers and a throwaway artifact store.
pub(crate) fn tools(llm: ScriptedLlm) -> StageTools {
    tools_with(llm, ProviderRegistry::new(), MemoryArtifactStore::default())
}

pub(crate) fn tools_with(
    llm: ScriptedLlm,
    providers: ProviderRegistry,
    artifacts: MemoryArtifactStore,
) -> StageTools {
    StageTools {
        aggregator: Arc::new(SearchAggregator::new(providers)),
        artifacts: Arc::new(BoxArtifactStore::new(artifacts)),
        fetcher: Arc::new(SeedFetcher::new(BoxPageFetcher::new(StaticPageFetcher::default()))),
        llm: Arc::new(BoxLlmProvider::new(llm)),
        llm_defaults: LlmConfig::default(),
        prompts: Arc::new(AgentPrompts::default()),
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Page fetcher serving fixed bodies. Unknown URLs are a 404.
#[derive(Default)]
pub(crate) struct StaticPageFetcher {
    pages: BTreeMap<String, String>,
    delays: BTreeMap<String, Duration>,
}

impl StaticPageFetcher {
    pub(crate) fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    /// Answer `url` only after `delay`.
    pub(crate) fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }
}

impl PageFetcher for StaticPageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ProviderError>> + Send {
        let page = self.pages.get(url).cloned();
        let delay = self.delays.get(url).copied();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            page.ok_or_else(|| ProviderError::Http {
                status: 404,
                body: "not found".to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Model stub that answers with queued responses, in order.
pub(crate) struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedLlm {
    pub(crate) fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::new(AtomicU32::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidRequest("no scripted response left".into())));
        let model = request.model.clone();
        async move {
            next.map(|content| CompletionResponse {
                id: format!("scripted-{n}"),
                content,
                model,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Search providers
// ---------------------------------------------------------------------------

/// Provider that returns fixed records.
pub(crate) struct StaticSearchProvider {
    name: String,
    capabilities: SearchCapabilities,
    records: Vec<SourceRecord>,
    context: Option<String>,
}

impl StaticSearchProvider {
    pub(crate) fn lexical(name: &str, records: Vec<SourceRecord>) -> Self {
        Self {
            name: name.to_string(),
            capabilities: SearchCapabilities {
                lexical: true,
                ..Default::default()
            },
            records,
            context: None,
        }
    }

    pub(crate) fn semantic(name: &str, records: Vec<SourceRecord>) -> Self {
        Self {
            name: name.to_string(),
            capabilities: SearchCapabilities {
                semantic: true,
                ..Default::default()
            },
            records,
            context: None,
        }
    }

    pub(crate) fn with_context(mut self, text: &str) -> Self {
        self.capabilities.context = true;
        self.context = Some(text.to_string());
        self
    }
}

impl SearchProvider for StaticSearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> SearchCapabilities {
        self.capabilities
    }

    fn lexical_search(
        &self,
        _query: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, ProviderError>> + Send {
        let records = self.records.iter().take(limit as usize).cloned().collect();
        std::future::ready(Ok(records))
    }

    fn semantic_search(
        &self,
        _query: &str,
        _mode: SearchMode,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, ProviderError>> + Send {
        let records = self.records.iter().take(limit as usize).cloned().collect();
        std::future::ready(Ok(records))
    }

    fn context_search(&self, _query: &str) -> impl Future<Output = Result<String, ProviderError>> + Send {
        std::future::ready(Ok(self.context.clone().unwrap_or_default()))
    }
}

/// Lexical provider that always fails with the same error.
pub(crate) struct FailingSearchProvider {
    name: String,
    error: ProviderError,
    calls: Arc<AtomicU32>,
}

impl FailingSearchProvider {
    pub(crate) fn new(name: &str, error: ProviderError) -> Self {
        Self {
            name: name.to_string(),
            error,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl SearchProvider for FailingSearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> SearchCapabilities {
        SearchCapabilities {
            lexical: true,
            ..Default::default()
        }
    }

    fn lexical_search(
        &self,
        _query: &str,
        _limit: u32,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, ProviderError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Err(self.error.clone()))
    }
}

/// Lexical provider that answers after a delay.
pub(crate) struct SlowSearchProvider {
    name: String,
    delay: Duration,
    records: Vec<SourceRecord>,
}

impl SlowSearchProvider {
    pub(crate) fn new(name: &str, delay: Duration, records: Vec<SourceRecord>) -> Self {
        Self {
            name: name.to_string(),
            delay,
            records,
        }
    }
}

impl SearchProvider for SlowSearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> SearchCapabilities {
        SearchCapabilities {
            lexical: true,
            ..Default::default()
        }
    }

    fn lexical_search(
        &self,
        _query: &str,
        _limit: u32,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, ProviderError>> + Send {
        let delay = self.delay;
        let records = self.records.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(records)
        }
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn done(name: &str) -> StateUpdate {
    StateUpdate::default().message(
        LogEntry::new(format!("{name}-done"), LogRole::Assistant, format!("{name} finished"))
            .with_stage(name),
    )
}

/// Stage that only logs that it ran.
pub(crate) struct NoopStage {
    name: String,
}

impl NoopStage {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Stage for NoopStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: StageInput<'a>,
    ) -> impl Future<Output = Result<StateUpdate, StageError>> + Send + 'a {
        std::future::ready(Ok(done(&self.name)))
    }
}

/// Noop stage that counts its invocations.
pub(crate) struct CountingStage {
    name: String,
    calls: Arc<AtomicU32>,
}

impl CountingStage {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl Stage for CountingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: StageInput<'a>,
    ) -> impl Future<Output = Result<StateUpdate, StageError>> + Send + 'a {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(done(&self.name)))
    }
}

/// Stage that fails with a model error for its first `failures` attempts.
pub(crate) struct FailingStage {
    name: String,
    error: LlmError,
    failures: u32,
    attempts: Arc<AtomicU32>,
}

impl FailingStage {
    /// Fails on every attempt until [`succeed_after`](Self::succeed_after) is set.
    pub(crate) fn new(name: &str, error: LlmError) -> Self {
        Self {
            name: name.to_string(),
            error,
            failures: u32::MAX,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub(crate) fn succeed_after(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn attempts(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: StageInput<'a>,
    ) -> impl Future<Output = Result<StateUpdate, StageError>> + Send + 'a {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let result = if attempt <= self.failures {
            Err(StageError::Model(self.error.clone()))
        } else {
            Ok(done(&self.name))
        };
        std::future::ready(result)
    }
}

/// Stage that sleeps before finishing.
pub(crate) struct SlowStage {
    name: String,
    delay: Duration,
}

impl SlowStage {
    pub(crate) fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
        }
    }
}

impl Stage for SlowStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(
        &'a self,
        _input: StageInput<'a>,
    ) -> impl Future<Output = Result<StateUpdate, StageError>> + Send + 'a {
        async move {
            tokio::time::sleep(self.delay).await;
            Ok(done(&self.name))
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact store
// ---------------------------------------------------------------------------

/// Artifact store that keeps everything in memory. Clones share contents.
#[derive(Clone, Default)]
pub(crate) struct MemoryArtifactStore {
    pub(crate) memories: Arc<Mutex<Vec<String>>>,
    pub(crate) notes: Arc<Mutex<BTreeMap<String, String>>>,
    pub(crate) sources_csv: Arc<Mutex<Option<String>>>,
    pub(crate) report: Arc<Mutex<Option<String>>>,
}

impl MemoryArtifactStore {
    pub(crate) fn with_memories(memories: Vec<String>) -> Self {
        let store = Self::default();
        *store.memories.lock().unwrap() = memories;
        store
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load_memories(&self) -> impl Future<Output = Vec<String>> + Send {
        std::future::ready(self.memories.lock().unwrap().clone())
    }

    fn persist_run(
        &self,
        run: &RunArtifacts<'_>,
    ) -> impl Future<Output = Result<PathBuf, ArtifactError>> + Send {
        let document = render_memory_document(run, Utc::now());
        let mut memories = self.memories.lock().unwrap();
        memories.push(document);
        let path = PathBuf::from(format!(".memories/{}-{}.md", slug(run.topic), memories.len()));
        std::future::ready(Ok(path))
    }

    fn persist_notes(
        &self,
        topic: &str,
        notes: &[AtomicNote],
    ) -> impl Future<Output = Result<Vec<PathBuf>, ArtifactError>> + Send {
        let mut vault = self.notes.lock().unwrap();
        let paths = notes
            .iter()
            .map(|note| {
                vault.insert(note.id.clone(), render_atomic_note(note, topic, Utc::now()));
                PathBuf::from(".vault").join(note.file_name())
            })
            .collect();
        std::future::ready(Ok(paths))
    }

    fn write_sources(
        &self,
        sources: &[SourceRecord],
    ) -> impl Future<Output = Result<PathBuf, ArtifactError>> + Send {
        *self.sources_csv.lock().unwrap() = Some(render_sources_csv(sources));
        std::future::ready(Ok(PathBuf::from("outputs/sources.csv")))
    }

    fn write_report(&self, report: &str) -> impl Future<Output = Result<PathBuf, ArtifactError>> + Send {
        *self.report.lock().unwrap() = Some(report.to_string());
        std::future::ready(Ok(PathBuf::from("outputs/report.md")))
    }
}

// ---------------------------------------------------------------------------
// Run repository
// ---------------------------------------------------------------------------

/// In-memory run repository. Clones share contents.
#[derive(Clone, Default)]
pub(crate) struct MemoryRunRepository {
    runs: Arc<Mutex<Vec<RunRecord>>>,
    checkpoints: Arc<Mutex<Vec<Checkpoint>>>,
    yield_on_get: bool,
    reject_checkpoints: bool,
}

impl MemoryRunRepository {
    /// `get_run` yields to the scheduler once before answering.
    pub(crate) fn yielding_reads(mut self) -> Self {
        self.yield_on_get = true;
        self
    }

    /// Every `save_checkpoint` fails with a query error.
    pub(crate) fn rejecting_checkpoints(mut self) -> Self {
        self.reject_checkpoints = true;
        self
    }
}

impl RunRepository for MemoryRunRepository {
    fn create_run(&self, run: &RunRecord) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        let mut runs = self.runs.lock().unwrap();
        let result = if runs.iter().any(|r| r.id == run.id) {
            Err(RepositoryError::Conflict(run.id.to_string()))
        } else {
            runs.push(run.clone());
            Ok(())
        };
        std::future::ready(result)
    }

    fn update_run_status(
        &self,
        run_id: &Uuid,
        status: RunStatus,
        error: Option<&str>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        let mut runs = self.runs.lock().unwrap();
        let result = match runs.iter_mut().find(|r| r.id == *run_id) {
            Some(run) => {
                run.status = status;
                run.error = error.map(str::to_string);
                run.completed_at = match status {
                    RunStatus::Running => None,
                    _ => Some(Utc::now()),
                };
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        };
        std::future::ready(result)
    }

    fn get_run(
        &self,
        run_id: &Uuid,
    ) -> impl Future<Output = Result<Option<RunRecord>, RepositoryError>> + Send {
        let run = self.runs.lock().unwrap().iter().find(|r| r.id == *run_id).cloned();
        let yield_first = self.yield_on_get;
        async move {
            if yield_first {
                tokio::task::yield_now().await;
            }
            Ok(run)
        }
    }

    fn list_runs(&self, limit: u32) -> impl Future<Output = Result<Vec<RunRecord>, RepositoryError>> + Send {
        let mut runs = self.runs.lock().unwrap().clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        runs.truncate(limit as usize);
        std::future::ready(Ok(runs))
    }

    fn save_checkpoint(
        &self,
        checkpoint: &Checkpoint,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        if self.reject_checkpoints {
            return std::future::ready(Err(RepositoryError::Query("disk full".to_string())));
        }
        let mut checkpoints = self.checkpoints.lock().unwrap();
        checkpoints.retain(|c| {
            !(c.run_id == checkpoint.run_id && c.stage_index == checkpoint.stage_index)
        });
        checkpoints.push(checkpoint.clone());

        if let Some(run) = self
            .runs
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.id == checkpoint.run_id)
        {
            run.last_stage_index = Some(checkpoint.stage_index);
        }
        std::future::ready(Ok(()))
    }

    fn latest_checkpoint(
        &self,
        run_id: &Uuid,
    ) -> impl Future<Output = Result<Option<Checkpoint>, RepositoryError>> + Send {
        let latest = self
            .checkpoints
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.run_id == *run_id)
            .max_by_key(|c| c.stage_index)
            .cloned();
        std::future::ready(Ok(latest))
    }

    fn list_checkpoints(
        &self,
        run_id: &Uuid,
    ) -> impl Future<Output = Result<Vec<Checkpoint>, RepositoryError>> + Send {
        let mut list: Vec<Checkpoint> = self
            .checkpoints
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.run_id == *run_id)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.stage_index);
        std::future::ready(Ok(list))
    }
}
