//! Brave web search (lexical).

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use quarry_core::search::SearchProvider;
use quarry_types::config::BraveConfig;
use quarry_types::search::{ProviderError, SearchCapabilities};
use quarry_types::source::{SourceRecord, parse_score};

use super::{check_status, http_client, transport_error};

pub const PROVIDER: &str = "brave";

#[derive(Debug, Default, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveWeb,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: Option<serde_json::Value>,
}

/// Parse a Brave response body into source records.
pub fn parse_results(body: &str) -> Result<Vec<SourceRecord>, ProviderError> {
    let response: BraveResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(response
        .web
        .results
        .into_iter()
        .map(|r| {
            let score = r.score.as_ref().and_then(parse_score);
            SourceRecord::new(r.title, r.url, r.description, PROVIDER, score)
        })
        .collect())
}

/// Brave Search API client.
///
/// Does not derive Debug: the subscription token lives in this struct.
pub struct BraveSearchProvider {
    client: reqwest::Client,
    config: BraveConfig,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl BraveSearchProvider {
    pub fn new(config: BraveConfig, api_key: Option<SecretString>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            config,
            api_key,
            timeout,
        }
    }

    fn api_key(&self) -> Result<&SecretString, ProviderError> {
        self.api_key
            .as_ref()
            .ok_or_else(|| ProviderError::MissingCredential {
                variable: self.config.api_key_env.clone(),
            })
    }
}

impl SearchProvider for BraveSearchProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn capabilities(&self) -> SearchCapabilities {
        SearchCapabilities {
            lexical: true,
            semantic: false,
            context: false,
        }
    }

    async fn lexical_search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SourceRecord>, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(&self.config.url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key.expose_secret())
            .query(&[("q", query.to_string()), ("count", limit.to_string())])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let body = check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let records = parse_results(&body)?;
        tracing::debug!(provider = PROVIDER, results = records.len(), "lexical search done");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_maps_fields() {
        let body = r#"{"web": {"results": [
            {"title": "Neo4j", "url": "https://neo4j.com", "description": "graph db", "score": "1.5"},
            {"title": "Dgraph", "url": "https://dgraph.io"}
        ]}}"#;
        let records = parse_results(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].notes, "graph db");
        assert_eq!(records[0].provider, "brave");
        assert_eq!(records[0].score, Some(1.5));
        assert_eq!(records[1].notes, "");
        assert_eq!(records[1].score, None);
    }

    #[test]
    fn test_parse_results_without_web_section() {
        assert!(parse_results("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_results_rejects_invalid_json() {
        assert!(matches!(parse_results("<html>"), Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_key_reports_variable() {
        let provider =
            BraveSearchProvider::new(BraveConfig::default(), None, Duration::from_secs(1));
        let err = provider.lexical_search("graphs", 5).await.unwrap_err();
        assert_eq!(err.to_string(), "BRAVE_SEARCH_API_KEY is not set.");
        assert!(!err.is_transient());
    }
}
