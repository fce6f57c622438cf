//! Application state wiring all services together.
//!
//! AppState holds the pipeline engine pinned to the concrete infra
//! implementations. Used by both CLI commands and REST API handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use quarry_core::memory::BoxArtifactStore;
use quarry_core::pipeline::{PipelineEngine, RetryPolicy, StageTools};
use quarry_core::search::SearchAggregator;
use quarry_core::stages::default_registry;
use quarry_infra::config::{load_config, load_prompts};
use quarry_infra::filesystem::{ArtifactLayout, LocalArtifactStore, resolve_data_dir};
use quarry_infra::llm::create_provider;
use quarry_infra::search::{build_fetcher, build_registry};
use quarry_infra::sqlite::pool::{DatabasePool, database_url};
use quarry_infra::sqlite::run::SqliteRunRepository;
use quarry_types::config::QuarryConfig;

/// The engine pinned to SQLite checkpoints.
pub type Engine = PipelineEngine<SqliteRunRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub config: Arc<QuarryConfig>,
    pub layout: ArtifactLayout,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::open(resolve_data_dir()).await
    }

    /// Load config and prompts from `data_dir`, connect the database, and
    /// wire the engine.
    pub async fn open(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        let prompts = load_prompts(&data_dir).await;
        let layout = ArtifactLayout::from_config(&data_dir, &config.paths);

        let db_path = data_dir.join(&config.paths.database);
        let db_pool = DatabasePool::new(&database_url(&db_path))
            .await
            .with_context(|| format!("failed to open database {}", db_path.display()))?;

        let retry = RetryPolicy::from(&config.retry);
        let aggregator = SearchAggregator::new(build_registry(&config.search))
            .with_timeout(Duration::from_secs(config.search.provider_timeout_secs))
            .with_retry(retry.clone());

        let tools = StageTools {
            aggregator: Arc::new(aggregator),
            artifacts: Arc::new(BoxArtifactStore::new(LocalArtifactStore::new(layout.clone()))),
            fetcher: Arc::new(build_fetcher(&config.search.fetch)),
            llm: Arc::new(create_provider(&config.llm)),
            llm_defaults: config.llm.clone(),
            prompts: Arc::new(prompts),
        };

        let registry = default_registry().context("failed to build workflow registry")?;
        let engine = PipelineEngine::new(
            registry,
            SqliteRunRepository::new(db_pool),
            tools,
            retry,
        );

        tracing::debug!(data_dir = %data_dir.display(), "application state ready");
        Ok(Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            layout,
            data_dir,
        })
    }
}
