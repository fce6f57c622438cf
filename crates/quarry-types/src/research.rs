//! Research run requests and their validation.
//!
//! A `ResearchRequest` is what a caller submits (CLI flags or the REST body).
//! It is validated once, before any run state exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::query::SearchQuerySpec;
use crate::search::SearchMode;

/// Minimum topic length in characters (after trimming).
pub const MIN_TOPIC_CHARS: usize = 3;

/// Inclusive bounds for `search_limit`.
pub const MIN_SEARCH_LIMIT: u32 = 1;
pub const MAX_SEARCH_LIMIT: u32 = 15;

fn default_search_limit() -> u32 {
    MAX_SEARCH_LIMIT
}

/// Per-run model overrides. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// A request to run a research workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
    #[serde(default)]
    pub seed_urls: Vec<String>,
    #[serde(default)]
    pub experiment_snippets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchQuerySpec>,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    #[serde(default, alias = "exa_search_type")]
    pub search_mode: SearchMode,
    #[serde(default)]
    pub fetch_code_context: bool,
    #[serde(default, alias = "llm_config", skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmSettings>,
    /// External repository references in `owner/repo` form.
    #[serde(default)]
    pub repositories: Vec<String>,
}

impl ResearchRequest {
    /// A request for `topic` with every other field at its default.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            seed_urls: Vec::new(),
            experiment_snippets: Vec::new(),
            search: None,
            search_limit: default_search_limit(),
            search_mode: SearchMode::default(),
            fetch_code_context: false,
            llm: None,
            repositories: Vec::new(),
        }
    }

    /// Check every field constraint. The first violation wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let topic_chars = self.topic.trim().chars().count();
        if topic_chars < MIN_TOPIC_CHARS {
            return Err(ValidationError::TopicTooShort {
                min: MIN_TOPIC_CHARS,
                actual: topic_chars,
            });
        }

        if !(MIN_SEARCH_LIMIT..=MAX_SEARCH_LIMIT).contains(&self.search_limit) {
            return Err(ValidationError::SearchLimitOutOfRange {
                value: self.search_limit,
                min: MIN_SEARCH_LIMIT,
                max: MAX_SEARCH_LIMIT,
            });
        }

        self.repository_refs()?;
        Ok(())
    }

    /// Parse the repository references.
    pub fn repository_refs(&self) -> Result<Vec<RepositoryRef>, ValidationError> {
        self.repositories.iter().map(|r| r.parse()).collect()
    }
}

/// A validated `owner/repo` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    /// Browser URL for the repository on GitHub.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedRepository(s.to_string());
        let (owner, name) = s.trim().split_once('/').ok_or_else(malformed)?;

        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_part(owner) || !valid_part(name) {
            return Err(malformed());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}
