//! Search aggregator: fan out to every capable provider, isolate failures,
//! and merge the results.
//!
//! A provider failure never fails the aggregate call. It contributes an
//! empty value plus a `"{provider}: {error}"` diagnostic, so a run with one
//! broken provider still gets the other providers' results.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinSet;

use quarry_types::query::CompiledQuery;
use quarry_types::search::{Capability, ProviderError, SearchMode};
use quarry_types::source::SourceRecord;

use super::box_provider::BoxSearchProvider;
use super::rank::merge_and_rank;
use super::registry::ProviderRegistry;
use crate::pipeline::retry::RetryPolicy;

/// Default per-provider timeout.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(20);

/// A value plus the diagnostics collected while producing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome<T> {
    pub value: T,
    pub diagnostics: Vec<String>,
}

type ProviderCall<T> =
    Arc<dyn Fn(Arc<BoxSearchProvider>, String) -> BoxFuture<'static, Result<T, ProviderError>> + Send + Sync>;

/// Fans queries out to the registered providers.
pub struct SearchAggregator {
    registry: ProviderRegistry,
    timeout: Duration,
    retry: RetryPolicy,
}

impl SearchAggregator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the per-provider, per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Boolean-query search across every lexical provider.
    ///
    /// Records are concatenated in provider registration order.
    pub async fn lexical_search(&self, query: &str, limit: u32) -> SearchOutcome<Vec<SourceRecord>> {
        let call: ProviderCall<Vec<SourceRecord>> = Arc::new(move |provider, query| {
            Box::pin(async move { provider.lexical_search(&query, limit).await })
        });
        let results = self.fan_out(Capability::Lexical, query, call).await;
        collect_records(results)
    }

    /// Natural-language search across every semantic provider.
    pub async fn semantic_search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: u32,
    ) -> SearchOutcome<Vec<SourceRecord>> {
        let call: ProviderCall<Vec<SourceRecord>> = Arc::new(move |provider, query| {
            Box::pin(async move { provider.semantic_search(&query, mode, limit).await })
        });
        let results = self.fan_out(Capability::Semantic, query, call).await;
        collect_records(results)
    }

    /// Code/context lookup. Non-empty answers are joined with blank lines.
    pub async fn context_search(&self, query: &str) -> SearchOutcome<String> {
        let call: ProviderCall<String> = Arc::new(|provider, query| {
            Box::pin(async move { provider.context_search(&query).await })
        });
        let results = self.fan_out(Capability::Context, query, call).await;

        let mut outcome = SearchOutcome::<String>::default();
        let mut parts = Vec::new();
        for (name, result) in results {
            match result {
                Ok(text) if !text.trim().is_empty() => parts.push(text),
                Ok(_) => {}
                Err(err) => outcome.diagnostics.push(format!("{name}: {err}")),
            }
        }
        outcome.value = parts.join("\n\n");
        outcome
    }

    /// Run lexical and semantic search concurrently, then merge and rank
    /// with lexical results as the primary list.
    pub async fn search(
        &self,
        compiled: &CompiledQuery,
        mode: SearchMode,
        limit: u32,
    ) -> SearchOutcome<Vec<SourceRecord>> {
        let (lexical, semantic) = tokio::join!(
            self.lexical_search(&compiled.boolean, limit),
            self.semantic_search(&compiled.semantic, mode, limit),
        );

        let mut diagnostics = lexical.diagnostics;
        diagnostics.extend(semantic.diagnostics);

        let value = merge_and_rank(lexical.value, semantic.value, limit as usize);
        tracing::debug!(
            sources = value.len(),
            diagnostics = diagnostics.len(),
            "search merged"
        );

        SearchOutcome { value, diagnostics }
    }

    /// Spawn one task per provider supporting `capability` and collect the
    /// results in registration order.
    async fn fan_out<T>(
        &self,
        capability: Capability,
        query: &str,
        call: ProviderCall<T>,
    ) -> Vec<(String, Result<T, ProviderError>)>
    where
        T: Send + 'static,
    {
        let providers: Vec<Arc<BoxSearchProvider>> = self
            .registry
            .providers()
            .iter()
            .filter(|p| capability.supported_by(&p.capabilities()))
            .cloned()
            .collect();

        if providers.is_empty() {
            tracing::debug!(%capability, "no provider supports capability");
            return Vec::new();
        }

        let names: Vec<String> = providers.iter().map(|p| p.name().to_string()).collect();
        let mut slots: Vec<Option<Result<T, ProviderError>>> =
            std::iter::repeat_with(|| None).take(providers.len()).collect();

        let mut tasks = JoinSet::new();
        for (index, provider) in providers.into_iter().enumerate() {
            let call = Arc::clone(&call);
            let query = query.to_string();
            let retry = self.retry.clone();
            let timeout = self.timeout;

            tasks.spawn(async move {
                let result = retry
                    .run(
                        |_| {
                            let fut = call(Arc::clone(&provider), query.clone());
                            async move {
                                match tokio::time::timeout(timeout, fut).await {
                                    Ok(result) => result,
                                    Err(_) => Err(ProviderError::Timeout {
                                        after_ms: timeout.as_millis() as u64,
                                    }),
                                }
                            }
                        },
                        ProviderError::is_transient,
                    )
                    .await;
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(ref err) = result {
                        tracing::warn!(
                            provider = %names[index],
                            %capability,
                            error = %err,
                            "search provider failed"
                        );
                    }
                    slots[index] = Some(result);
                }
                Err(err) => {
                    tracing::error!(%capability, error = %err, "search task panicked");
                }
            }
        }

        names
            .into_iter()
            .zip(slots)
            .map(|(name, slot)| {
                let result = slot
                    .unwrap_or_else(|| Err(ProviderError::Network("search task aborted".to_string())));
                (name, result)
            })
            .collect()
    }
}

fn collect_records(
    results: Vec<(String, Result<Vec<SourceRecord>, ProviderError>)>,
) -> SearchOutcome<Vec<SourceRecord>> {
    let mut outcome = SearchOutcome::<Vec<SourceRecord>>::default();
    for (name, result) in results {
        match result {
            Ok(records) => outcome.value.extend(records),
            Err(err) => outcome.diagnostics.push(format!("{name}: {err}")),
        }
    }
    outcome
}
