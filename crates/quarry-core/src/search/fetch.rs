//! Seed URL fetching.
//!
//! `PageFetcher` is the port a backend implements to read the start of a
//! web page. `SeedFetcher` fetches a run's seed URLs concurrently and, like
//! the aggregator, turns failures into diagnostics instead of errors.

use std::future::Future;
use std::time::Duration;

use futures_util::future::{BoxFuture, join_all};

use quarry_types::search::ProviderError;

use super::aggregator::SearchOutcome;

/// Default per-URL timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads the beginning of a page as text.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Object-safe version of [`PageFetcher`].
pub trait PageFetcherDyn: Send + Sync {
    fn fetch_boxed<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, ProviderError>>;
}

impl<T: PageFetcher> PageFetcherDyn for T {
    fn fetch_boxed<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.fetch(url))
    }
}

/// Type-erased page fetcher.
pub struct BoxPageFetcher {
    inner: Box<dyn PageFetcherDyn>,
}

impl BoxPageFetcher {
    pub fn new<T: PageFetcher + 'static>(fetcher: T) -> Self {
        Self {
            inner: Box::new(fetcher),
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<String, ProviderError> {
        self.inner.fetch_boxed(url).await
    }
}

impl std::fmt::Debug for BoxPageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxPageFetcher").finish_non_exhaustive()
    }
}

/// Fetcher used when seed fetching is switched off.
pub struct DisabledFetcher;

impl PageFetcher for DisabledFetcher {
    fn fetch(&self, _url: &str) -> impl Future<Output = Result<String, ProviderError>> + Send {
        std::future::ready(Err(ProviderError::Network("seed fetching is disabled".to_string())))
    }
}

// ---------------------------------------------------------------------------
// SeedFetcher
// ---------------------------------------------------------------------------

/// The text fetched for one seed URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PageExcerpt {
    pub url: String,
    pub text: String,
}

/// Fetches seed URLs concurrently, each under its own timeout.
#[derive(Debug)]
pub struct SeedFetcher {
    fetcher: BoxPageFetcher,
    timeout: Duration,
    enabled: bool,
}

impl SeedFetcher {
    pub fn new(fetcher: BoxPageFetcher) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_FETCH_TIMEOUT,
            enabled: true,
        }
    }

    /// A fetcher that never touches the network and reports nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(BoxPageFetcher::new(DisabledFetcher))
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch every URL. Excerpts keep the input order; failed, timed-out
    /// and blank pages are left out, failures as `"fetch {url}: {error}"`.
    pub async fn fetch_all(&self, urls: &[String]) -> SearchOutcome<Vec<PageExcerpt>> {
        if !self.enabled || urls.is_empty() {
            return SearchOutcome::default();
        }

        let results = join_all(urls.iter().map(|url| async move {
            let result = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    after_ms: self.timeout.as_millis() as u64,
                }),
            };
            (url, result)
        }))
        .await;

        let mut outcome = SearchOutcome::<Vec<PageExcerpt>>::default();
        for (url, result) in results {
            match result {
                Ok(text) if !text.trim().is_empty() => outcome.value.push(PageExcerpt {
                    url: url.clone(),
                    text,
                }),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%url, error = %err, "seed fetch failed");
                    outcome.diagnostics.push(format!("fetch {url}: {err}"));
                }
            }
        }
        outcome
    }
}
