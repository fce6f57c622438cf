//! Structured search query specification.
//!
//! A `SearchQuerySpec` is either a raw provider string or a set of term
//! lists. The query compiler in `quarry-core` turns it into boolean and
//! semantic query strings.

use serde::{Deserialize, Serialize};

/// Declarative description of a search.
///
/// When `raw` is present and non-empty it takes absolute precedence: none of
/// the term lists are consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default)]
    pub all_terms: Vec<String>,
    #[serde(default)]
    pub any_terms: Vec<String>,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub filetypes: Vec<String>,
    #[serde(default)]
    pub intitle: Vec<String>,
    #[serde(default)]
    pub inurl: Vec<String>,
}

impl SearchQuerySpec {
    /// A spec carrying only a raw query string.
    pub fn raw(query: impl Into<String>) -> Self {
        Self {
            raw: Some(query.into()),
            ..Self::default()
        }
    }

    /// The raw string, if present and non-empty.
    pub fn raw_query(&self) -> Option<&str> {
        self.raw.as_deref().filter(|r| !r.is_empty())
    }
}

/// Query strings produced for one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Boolean query for lexical (keyword) providers.
    pub boolean: String,
    /// Natural-language query for semantic providers.
    pub semantic: String,
}
