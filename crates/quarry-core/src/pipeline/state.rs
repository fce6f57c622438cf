//! Run state and the per-field merge reducer.
//!
//! `ResearchState` is the only mutable thing a run owns. Stages never touch
//! it directly: they return a `StateUpdate` and the engine merges it with
//! [`ResearchState::apply`]. Every field replaces on `Some`; `messages`
//! upserts by id. Applying the same update twice yields the same state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quarry_types::note::AtomicNote;
use quarry_types::query::{CompiledQuery, SearchQuerySpec};
use quarry_types::research::ResearchRequest;
use quarry_types::source::SourceRecord;

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Who produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRole {
    System,
    Human,
    Assistant,
    Tool,
}

/// One entry in the run's ordered log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stable id; an entry with a known id replaces the earlier one.
    pub id: String,
    pub role: LogRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(id: impl Into<String>, role: LogRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            stage: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Accumulated state of one run. Serialized as the checkpoint payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    #[serde(default)]
    pub messages: Vec<LogEntry>,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<SearchQuerySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_query: Option<CompiledQuery>,
    #[serde(default)]
    pub research_notes: Vec<String>,
    #[serde(default)]
    pub experiments: Vec<String>,
    #[serde(default)]
    pub code_context: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub report: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(default)]
    pub atomic_notes: Vec<AtomicNote>,
    #[serde(default)]
    pub memories: Vec<String>,
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub key_insights: Vec<String>,
}

impl ResearchState {
    /// Initial state for a new run of `workflow`.
    pub fn initial(workflow: &str, request: &ResearchRequest, memories: Vec<String>) -> Self {
        let topic = request.topic.trim().to_string();
        Self {
            messages: vec![
                LogEntry::new(
                    "run-start",
                    LogRole::System,
                    format!("Starting {workflow} workflow."),
                ),
                LogEntry::new(
                    "run-topic",
                    LogRole::Human,
                    format!("Please process the topic: {topic}"),
                ),
            ],
            topic,
            search_query: request.search.clone(),
            experiments: request.experiment_snippets.clone(),
            memories,
            ..Self::default()
        }
    }

    /// Merge a stage's update into this state.
    pub fn apply(&mut self, update: StateUpdate) {
        for entry in update.messages {
            match self.messages.iter_mut().find(|m| m.id == entry.id) {
                Some(existing) => *existing = entry,
                None => self.messages.push(entry),
            }
        }

        macro_rules! replace {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = update.$field {
                    self.$field = value;
                })+
            };
        }
        replace!(
            topic,
            research_notes,
            experiments,
            code_context,
            sources,
            report,
            atomic_notes,
            memories,
            reasoning,
            key_insights,
        );

        if let Some(query) = update.search_query {
            self.search_query = Some(query);
        }
        if let Some(compiled) = update.compiled_query {
            self.compiled_query = Some(compiled);
        }
        if let Some(path) = update.report_path {
            self.report_path = Some(path);
        }
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Partial state returned by a stage. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<SearchQuerySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiled_query: Option<CompiledQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_context: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomic_notes: Option<Vec<AtomicNote>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_insights: Option<Vec<String>>,
}

impl StateUpdate {
    pub fn message(mut self, entry: LogEntry) -> Self {
        self.messages.push(entry);
        self
    }
}
