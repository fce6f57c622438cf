//! Structured outputs requested from the model by each stage.
//!
//! Field doc comments double as JSON-schema descriptions (via `schemars`),
//! so they are written for the model, not for Rust readers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A source the model cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CitedSource {
    /// Title of the source
    pub title: String,
    /// URL of the source
    pub url: String,
    /// Brief summary of the content
    pub summary: String,
    /// Relevance score (1-10)
    pub relevance_score: f64,
}

/// Output of the researcher stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResearcherOutput {
    /// List of key findings and notes
    pub research_notes: Vec<String>,
    /// List of atomic insights
    pub key_insights: Vec<String>,
    /// List of sources used
    pub sources: Vec<CitedSource>,
    /// Chain of thought reasoning
    pub reasoning: Vec<String>,
}

/// Output of the summarizer stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummarizerOutput {
    /// Full markdown content of the report
    pub report_content: String,
    /// Brief executive summary
    pub executive_summary: String,
    /// List of source URLs referenced in the report
    pub sources_used: Vec<String>,
}

/// One atomic note proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedNote {
    /// Unique slug/ID for the note
    pub id: String,
    /// Title of the atomic note
    pub title: String,
    /// Markdown content of the note
    pub content: String,
    /// List of tags
    pub tags: Vec<String>,
}

/// Output of the note-extractor stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoteExtractionOutput {
    /// List of generated atomic notes
    pub notes: Vec<ExtractedNote>,
}
