//! Search capability types and provider errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Semantic search mode forwarded to semantic providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Let the provider pick.
    #[default]
    Auto,
    Neural,
    Keyword,
    Fast,
    Deep,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Auto => "auto",
            SearchMode::Neural => "neural",
            SearchMode::Keyword => "keyword",
            SearchMode::Fast => "fast",
            SearchMode::Deep => "deep",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SearchMode::Auto),
            "neural" => Ok(SearchMode::Neural),
            "keyword" => Ok(SearchMode::Keyword),
            "fast" => Ok(SearchMode::Fast),
            "deep" => Ok(SearchMode::Deep),
            other => Err(ValidationError::UnknownSearchMode(other.to_string())),
        }
    }
}

/// Which of the three search capabilities a provider implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCapabilities {
    pub lexical: bool,
    pub semantic: bool,
    pub context: bool,
}

/// The three capabilities, used for diagnostics and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Lexical,
    Semantic,
    Context,
}

impl Capability {
    pub fn supported_by(&self, caps: &SearchCapabilities) -> bool {
        match self {
            Capability::Lexical => caps.lexical,
            Capability::Semantic => caps.semantic,
            Capability::Context => caps.context,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Lexical => write!(f, "lexical"),
            Capability::Semantic => write!(f, "semantic"),
            Capability::Context => write!(f, "context"),
        }
    }
}

/// Errors from a single search provider call.
///
/// The aggregator never propagates these: they become an empty result plus
/// a diagnostic string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider's API key is not configured.
    #[error("{variable} is not set.")]
    MissingCredential { variable: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("{0} search is not supported")]
    Unsupported(Capability),
}

impl ProviderError {
    /// Network failures, timeouts, rate limits and server errors may succeed
    /// on a later attempt. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout { .. } => true,
            ProviderError::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            ProviderError::MissingCredential { .. }
            | ProviderError::Decode(_)
            | ProviderError::Unsupported(_) => false,
        }
    }
}
