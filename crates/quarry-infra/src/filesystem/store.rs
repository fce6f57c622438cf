//! `ArtifactStore` over local directories.

use std::path::{Path, PathBuf};

use chrono::Utc;

use quarry_core::memory::store::ArtifactStore;
use quarry_core::memory::{ArtifactError, RunArtifacts};
use quarry_types::config::PathsConfig;
use quarry_types::note::AtomicNote;
use quarry_types::source::SourceRecord;

/// Where each kind of artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub memories_dir: PathBuf,
    pub vault_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ArtifactLayout {
    /// Resolve configured paths; relative ones are joined onto `data_dir`.
    pub fn from_config(data_dir: &Path, paths: &PathsConfig) -> Self {
        Self {
            memories_dir: data_dir.join(&paths.memories_dir),
            vault_dir: data_dir.join(&paths.vault_dir),
            output_dir: data_dir.join(&paths.output_dir),
        }
    }

    pub fn sources_path(&self) -> PathBuf {
        self.output_dir.join("sources.csv")
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.md")
    }
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    layout: ArtifactLayout,
}

impl LocalArtifactStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }
}

impl ArtifactStore for LocalArtifactStore {
    async fn load_memories(&self) -> Vec<String> {
        super::load_memories(&self.layout.memories_dir).await
    }

    async fn persist_run(&self, run: &RunArtifacts<'_>) -> Result<PathBuf, ArtifactError> {
        super::persist_run(&self.layout.memories_dir, run, Utc::now()).await
    }

    async fn persist_notes(
        &self,
        topic: &str,
        notes: &[AtomicNote],
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        super::persist_notes(&self.layout.vault_dir, topic, notes, Utc::now()).await
    }

    async fn write_sources(&self, sources: &[SourceRecord]) -> Result<PathBuf, ArtifactError> {
        let path = self.layout.sources_path();
        super::write_sources(&path, sources).await?;
        Ok(path)
    }

    async fn write_report(&self, report: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.layout.report_path();
        super::write_report(&path, report).await?;
        Ok(path)
    }
}
