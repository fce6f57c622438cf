//! ArtifactStore trait and its type-erased wrapper.
//!
//! The filesystem implementation lives in quarry-infra
//! (`LocalArtifactStore`); tests use an in-memory one.

use std::path::PathBuf;

use futures_util::future::BoxFuture;

use quarry_types::note::AtomicNote;
use quarry_types::source::SourceRecord;

use super::document::RunArtifacts;

/// Errors from artifact persistence.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding error: {0}")]
    Encode(String),
}

/// Storage for everything a run leaves behind.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ArtifactStore: Send + Sync {
    /// Contents of every stored memory document, ordered by file name.
    ///
    /// Never fails: unreadable documents are skipped.
    fn load_memories(&self) -> impl std::future::Future<Output = Vec<String>> + Send;

    /// Append one new memory document for a finished run.
    fn persist_run(
        &self,
        run: &RunArtifacts<'_>,
    ) -> impl std::future::Future<Output = Result<PathBuf, ArtifactError>> + Send;

    /// Write atomic notes to the vault, replacing notes with the same id.
    fn persist_notes(
        &self,
        topic: &str,
        notes: &[AtomicNote],
    ) -> impl std::future::Future<Output = Result<Vec<PathBuf>, ArtifactError>> + Send;

    /// Write the sources CSV.
    fn write_sources(
        &self,
        sources: &[SourceRecord],
    ) -> impl std::future::Future<Output = Result<PathBuf, ArtifactError>> + Send;

    /// Write the report markdown.
    fn write_report(
        &self,
        report: &str,
    ) -> impl std::future::Future<Output = Result<PathBuf, ArtifactError>> + Send;
}

// ---------------------------------------------------------------------------
// Dynamic dispatch
// ---------------------------------------------------------------------------

/// Object-safe version of [`ArtifactStore`] with boxed futures.
pub trait ArtifactStoreDyn: Send + Sync {
    fn load_memories_boxed(&self) -> BoxFuture<'_, Vec<String>>;

    fn persist_run_boxed<'a>(
        &'a self,
        run: &'a RunArtifacts<'a>,
    ) -> BoxFuture<'a, Result<PathBuf, ArtifactError>>;

    fn persist_notes_boxed<'a>(
        &'a self,
        topic: &'a str,
        notes: &'a [AtomicNote],
    ) -> BoxFuture<'a, Result<Vec<PathBuf>, ArtifactError>>;

    fn write_sources_boxed<'a>(
        &'a self,
        sources: &'a [SourceRecord],
    ) -> BoxFuture<'a, Result<PathBuf, ArtifactError>>;

    fn write_report_boxed<'a>(
        &'a self,
        report: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, ArtifactError>>;
}

impl<T: ArtifactStore> ArtifactStoreDyn for T {
    fn load_memories_boxed(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(self.load_memories())
    }

    fn persist_run_boxed<'a>(
        &'a self,
        run: &'a RunArtifacts<'a>,
    ) -> BoxFuture<'a, Result<PathBuf, ArtifactError>> {
        Box::pin(self.persist_run(run))
    }

    fn persist_notes_boxed<'a>(
        &'a self,
        topic: &'a str,
        notes: &'a [AtomicNote],
    ) -> BoxFuture<'a, Result<Vec<PathBuf>, ArtifactError>> {
        Box::pin(self.persist_notes(topic, notes))
    }

    fn write_sources_boxed<'a>(
        &'a self,
        sources: &'a [SourceRecord],
    ) -> BoxFuture<'a, Result<PathBuf, ArtifactError>> {
        Box::pin(self.write_sources(sources))
    }

    fn write_report_boxed<'a>(
        &'a self,
        report: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, ArtifactError>> {
        Box::pin(self.write_report(report))
    }
}

/// Type-erased artifact store.
pub struct BoxArtifactStore {
    inner: Box<dyn ArtifactStoreDyn>,
}

impl BoxArtifactStore {
    pub fn new<T: ArtifactStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn load_memories(&self) -> Vec<String> {
        self.inner.load_memories_boxed().await
    }

    pub async fn persist_run(&self, run: &RunArtifacts<'_>) -> Result<PathBuf, ArtifactError> {
        self.inner.persist_run_boxed(run).await
    }

    pub async fn persist_notes(
        &self,
        topic: &str,
        notes: &[AtomicNote],
    ) -> Result<Vec<PathBuf>, ArtifactError> {
        self.inner.persist_notes_boxed(topic, notes).await
    }

    pub async fn write_sources(&self, sources: &[SourceRecord]) -> Result<PathBuf, ArtifactError> {
        self.inner.write_sources_boxed(sources).await
    }

    pub async fn write_report(&self, report: &str) -> Result<PathBuf, ArtifactError> {
        self.inner.write_report_boxed(report).await
    }
}
