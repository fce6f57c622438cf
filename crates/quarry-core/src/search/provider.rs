//! SearchProvider trait definition.
//!
//! The core abstraction every search backend implements. Uses RPITIT for the
//! async capability methods; capabilities a backend does not offer fall back
//! to `ProviderError::Unsupported`.

use std::future::Future;

use quarry_types::search::{Capability, ProviderError, SearchCapabilities, SearchMode};
use quarry_types::source::SourceRecord;

/// Trait for search backends (Brave, Exa, ...).
///
/// Implementations live in quarry-infra. Errors are returned, never
/// swallowed: turning them into empty results plus diagnostics is the
/// aggregator's job.
pub trait SearchProvider: Send + Sync {
    /// Short provider tag (e.g., "brave", "exa"). Also used as the
    /// `provider` field of the records it returns.
    fn name(&self) -> &str;

    /// Which capabilities this provider implements.
    fn capabilities(&self) -> SearchCapabilities;

    /// Keyword search with a boolean query string.
    fn lexical_search(
        &self,
        _query: &str,
        _limit: u32,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, ProviderError>> + Send {
        std::future::ready(Err(ProviderError::Unsupported(Capability::Lexical)))
    }

    /// Embedding/neural search with a natural-language query.
    fn semantic_search(
        &self,
        _query: &str,
        _mode: SearchMode,
        _limit: u32,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, ProviderError>> + Send {
        std::future::ready(Err(ProviderError::Unsupported(Capability::Semantic)))
    }

    /// Free-text context (e.g., code snippets) for a query.
    fn context_search(
        &self,
        _query: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        std::future::ready(Err(ProviderError::Unsupported(Capability::Context)))
    }
}
