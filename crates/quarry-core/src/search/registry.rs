//! Provider registry for the search aggregator.
//!
//! Providers are kept in registration order; the aggregator reports results
//! in that order regardless of which provider answers first.

use std::sync::Arc;

use super::box_provider::BoxSearchProvider;

/// Ordered registry of search providers, looked up by name.
pub struct ProviderRegistry {
    providers: Vec<Arc<BoxSearchProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider.
    ///
    /// A provider whose name is already registered replaces the old entry in
    /// its original position.
    pub fn register(&mut self, provider: BoxSearchProvider) {
        let provider = Arc::new(provider);
        match self
            .providers
            .iter()
            .position(|p| p.name() == provider.name())
        {
            Some(idx) => self.providers[idx] = provider,
            None => self.providers.push(provider),
        }
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<&Arc<BoxSearchProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// All providers, in registration order.
    pub fn providers(&self) -> &[Arc<BoxSearchProvider>] {
        &self.providers
    }

    /// List all registered provider names, in registration order.
    pub fn list_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
