//! Filesystem adapters for Quarry.
//!
//! Free functions for the on-disk artifact formats (memory documents, vault
//! notes, the sources CSV and the report) plus [`LocalArtifactStore`], which
//! implements the `ArtifactStore` port over a fixed directory layout.

pub mod store;

pub use store::{ArtifactLayout, LocalArtifactStore};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use quarry_core::memory::{
    ArtifactError, RunArtifacts, render_atomic_note, render_memory_document, render_sources_csv,
    slug,
};
use quarry_types::note::AtomicNote;
use quarry_types::source::SourceRecord;

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), ArtifactError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| io_error(dir, e))
}

/// Write `content` to `path`, creating parent directories and replacing any
/// existing file.
async fn write_file(path: &Path, content: &str) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| io_error(path, e))
}

// ---------------------------------------------------------------------------
// Memories
// ---------------------------------------------------------------------------

/// Contents of every `*.md` file in `dir`, ordered by file name.
///
/// A missing directory yields nothing. Unreadable entries are skipped with a
/// warning.
pub async fn load_memories(dir: &Path) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "no memories directory yet");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to list memories");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "md") {
                    paths.push(path);
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "failed to read directory entry");
                break;
            }
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut memories = Vec::with_capacity(paths.len());
    for path in paths {
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => memories.push(text),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable memory");
            }
        }
    }
    memories
}

/// Write one new memory document named `{slug}-{YYYYmmddHHMMSS}.md`.
///
/// Never overwrites: when the name is taken, `_1`, `_2`, ... is appended to
/// the stem until a free name is found.
pub async fn persist_run(
    dir: &Path,
    run: &RunArtifacts<'_>,
    now: DateTime<Utc>,
) -> Result<PathBuf, ArtifactError> {
    ensure_dir(dir).await?;

    let stem = format!("{}-{}", slug(run.topic), now.format("%Y%m%d%H%M%S"));
    let document = render_memory_document(run, now);

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.md")
        } else {
            format!("{stem}_{attempt}.md")
        };
        let path = dir.join(name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(document.as_bytes())
                    .await
                    .map_err(|e| io_error(&path, e))?;
                file.flush().await.map_err(|e| io_error(&path, e))?;
                tracing::info!(path = %path.display(), "memory document written");
                return Ok(path);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => return Err(io_error(&path, err)),
        }
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Write each note to `{vault_dir}/{id}.md`. Existing notes with the same id
/// are replaced.
pub async fn persist_notes(
    vault_dir: &Path,
    topic: &str,
    notes: &[AtomicNote],
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>, ArtifactError> {
    ensure_dir(vault_dir).await?;

    let mut paths = Vec::with_capacity(notes.len());
    for note in notes {
        let path = vault_dir.join(note.file_name());
        write_file(&path, &render_atomic_note(note, topic, now)).await?;
        paths.push(path);
    }
    tracing::debug!(dir = %vault_dir.display(), notes = paths.len(), "vault notes written");
    Ok(paths)
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Write the sources CSV to `path`.
pub async fn write_sources(path: &Path, sources: &[SourceRecord]) -> Result<(), ArtifactError> {
    write_file(path, &render_sources_csv(sources)).await
}

/// Write the report markdown to `path`.
pub async fn write_report(path: &Path, report: &str) -> Result<(), ArtifactError> {
    write_file(path, report).await
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `QUARRY_DATA_DIR` environment variable
/// 2. `~/.quarry`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("QUARRY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".quarry");
    }

    // Last resort: current directory
    PathBuf::from(".quarry")
}
