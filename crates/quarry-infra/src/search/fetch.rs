//! Plain HTTP GET fetcher for seed URLs.
//!
//! Reads only the first `max_bytes` of the body and decodes it lossily, so a
//! large or binary page never costs more than one small buffer.

use std::future::Future;
use std::time::Duration;

use quarry_core::search::{BoxPageFetcher, PageFetcher, SeedFetcher};
use quarry_types::config::FetchConfig;
use quarry_types::search::ProviderError;

use super::{check_status, http_client, transport_error};

pub struct HttpPageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client: http_client(timeout),
            timeout,
            max_bytes,
        }
    }

    async fn get(&self, url: &str) -> Result<String, ProviderError> {
        check_scheme(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let mut response = check_status(response).await?;

        let mut body: Vec<u8> = Vec::with_capacity(self.max_bytes.min(64 * 1024));
        while body.len() < self.max_bytes {
            match response
                .chunk()
                .await
                .map_err(|e| transport_error(e, self.timeout))?
            {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }

        tracing::debug!(%url, bytes = body.len(), "seed page fetched");
        Ok(excerpt(&body, self.max_bytes))
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ProviderError>> + Send {
        self.get(url)
    }
}

/// Only http and https URLs are fetched.
fn check_scheme(url: &str) -> Result<(), ProviderError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ProviderError::Network(format!(
            "unsupported URL {url:?}: must start with http:// or https://"
        )))
    }
}

/// First `max_bytes` of `body` as text. Invalid UTF-8, including a sequence
/// cut at the boundary, becomes U+FFFD.
fn excerpt(body: &[u8], max_bytes: usize) -> String {
    let end = body.len().min(max_bytes);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

/// Build the researcher's seed fetcher from configuration.
pub fn build_fetcher(config: &FetchConfig) -> SeedFetcher {
    if !config.enabled {
        tracing::debug!("seed URL fetching disabled");
        return SeedFetcher::disabled();
    }
    let timeout = Duration::from_secs(config.timeout_secs);
    SeedFetcher::new(BoxPageFetcher::new(HttpPageFetcher::new(
        timeout,
        config.max_bytes,
    )))
    .with_timeout(timeout)
}
