//! Search provider implementations.
//!
//! Concrete [`SearchProvider`](quarry_core::search::SearchProvider) backends
//! over HTTP, plus [`build_registry`] which assembles the enabled ones from
//! [`SearchConfig`].

pub mod brave;
pub mod exa;
pub mod fetch;

use std::time::Duration;

use secrecy::SecretString;

use quarry_core::search::{BoxSearchProvider, ProviderRegistry};
use quarry_types::config::SearchConfig;
use quarry_types::search::ProviderError;

pub use brave::BraveSearchProvider;
pub use exa::ExaSearchProvider;
pub use fetch::{HttpPageFetcher, build_fetcher};

/// User agent sent with every provider request.
pub(crate) const USER_AGENT: &str = concat!("quarry/", env!("CARGO_PKG_VERSION"));

/// Read an API key from the environment. Empty values count as unset.
pub fn api_key_from_env(variable: &str) -> Option<SecretString> {
    std::env::var(variable)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// HTTP client with a whole-request timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(error = %err, "failed to configure HTTP client, using defaults");
            reqwest::Client::new()
        }
    }
}

/// Map a transport error. Timeouts are reported with the configured budget.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Turn a non-success response into [`ProviderError::Http`]; pass others through.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Build the provider registry from configuration.
///
/// Providers are registered lexical-first (Brave, then Exa), which fixes
/// the order their results are concatenated in. Disabled providers are
/// skipped; enabled providers without a key stay registered and report
/// `MissingCredential` on each call.
pub fn build_registry(config: &SearchConfig) -> ProviderRegistry {
    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let mut registry = ProviderRegistry::new();

    if config.brave.enabled {
        registry.register(BoxSearchProvider::new(BraveSearchProvider::new(
            config.brave.clone(),
            api_key_from_env(&config.brave.api_key_env),
            timeout,
        )));
    }
    if config.exa.enabled {
        registry.register(BoxSearchProvider::new(ExaSearchProvider::new(
            config.exa.clone(),
            api_key_from_env(&config.exa.api_key_env),
            timeout,
        )));
    }

    tracing::debug!(providers = ?registry.list_names(), "search providers registered");
    registry
}
