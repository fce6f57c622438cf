//! BoxSearchProvider -- object-safe dynamic dispatch wrapper for SearchProvider.
//!
//! Same blanket-impl pattern as `BoxLlmProvider`:
//! 1. Define an object-safe `SearchProviderDyn` trait with boxed futures
//! 2. Blanket-impl `SearchProviderDyn` for all `T: SearchProvider`
//! 3. `BoxSearchProvider` wraps `Box<dyn SearchProviderDyn>` and delegates

use futures_util::future::BoxFuture;

use quarry_types::search::{ProviderError, SearchCapabilities, SearchMode};
use quarry_types::source::SourceRecord;

use super::provider::SearchProvider;

/// Object-safe version of [`SearchProvider`] with boxed futures.
pub trait SearchProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> SearchCapabilities;

    fn lexical_search_boxed<'a>(
        &'a self,
        query: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SourceRecord>, ProviderError>>;

    fn semantic_search_boxed<'a>(
        &'a self,
        query: &'a str,
        mode: SearchMode,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SourceRecord>, ProviderError>>;

    fn context_search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>>;
}

impl<T: SearchProvider> SearchProviderDyn for T {
    fn name(&self) -> &str {
        SearchProvider::name(self)
    }

    fn capabilities(&self) -> SearchCapabilities {
        SearchProvider::capabilities(self)
    }

    fn lexical_search_boxed<'a>(
        &'a self,
        query: &'a str,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SourceRecord>, ProviderError>> {
        Box::pin(self.lexical_search(query, limit))
    }

    fn semantic_search_boxed<'a>(
        &'a self,
        query: &'a str,
        mode: SearchMode,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<SourceRecord>, ProviderError>> {
        Box::pin(self.semantic_search(query, mode, limit))
    }

    fn context_search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.context_search(query))
    }
}

/// Type-erased search provider for runtime provider selection.
///
/// `SearchProvider` uses RPITIT and cannot be a trait object directly;
/// `BoxSearchProvider` offers the same methods over a `SearchProviderDyn`.
pub struct BoxSearchProvider {
    inner: Box<dyn SearchProviderDyn>,
}

impl BoxSearchProvider {
    /// Wrap a concrete `SearchProvider` in a type-erased box.
    pub fn new<T: SearchProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn capabilities(&self) -> SearchCapabilities {
        self.inner.capabilities()
    }

    pub async fn lexical_search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SourceRecord>, ProviderError> {
        self.inner.lexical_search_boxed(query, limit).await
    }

    pub async fn semantic_search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: u32,
    ) -> Result<Vec<SourceRecord>, ProviderError> {
        self.inner.semantic_search_boxed(query, mode, limit).await
    }

    pub async fn context_search(&self, query: &str) -> Result<String, ProviderError> {
        self.inner.context_search_boxed(query).await
    }
}

impl std::fmt::Debug for BoxSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxSearchProvider")
            .field("name", &self.name())
            .finish()
    }
}
