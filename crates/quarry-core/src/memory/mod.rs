//! Cross-run memory and artifacts.
//!
//! - `document`: memory document render/parse contract and `slug`
//! - `vault`: atomic and summary note rendering
//! - `report`: fallback report and sources CSV rendering
//! - `store`: the `ArtifactStore` port implemented in quarry-infra

pub mod document;
pub mod report;
pub mod store;
pub mod vault;

pub use document::{
    MemoryDocument, MemorySection, RunArtifacts, extract_insights, extract_memory_insights,
    parse_memory_document, render_memory_document, slug,
};
pub use report::{ReportInput, render_fallback_report, render_sources_csv};
pub use store::{ArtifactError, ArtifactStore, BoxArtifactStore};
pub use vault::{render_atomic_note, render_summary_note, summary_note_id};
