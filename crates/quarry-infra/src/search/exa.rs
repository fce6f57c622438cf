//! Exa search (semantic and code context).

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use quarry_core::search::SearchProvider;
use quarry_types::config::{ExaConfig, ProviderOptions};
use quarry_types::search::{ProviderError, SearchCapabilities, SearchMode};
use quarry_types::source::{SourceRecord, parse_score};

use super::{check_status, http_client, transport_error};

pub const PROVIDER: &str = "exa";

#[derive(Debug, Default, Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    score: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ExaContextResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Request body for `/search`.
///
/// Configured options are merged first; `query`, `numResults`,
/// `useAutoprompt` and `type` always take the call's values. `type` is
/// omitted for [`SearchMode::Auto`].
pub fn search_body(query: &str, mode: SearchMode, limit: u32, options: &ProviderOptions) -> Value {
    let mut body: Map<String, Value> = options
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    body.insert("query".to_string(), json!(query));
    body.insert("numResults".to_string(), json!(limit));
    body.insert("useAutoprompt".to_string(), json!(true));
    if mode == SearchMode::Auto {
        body.remove("type");
    } else {
        body.insert("type".to_string(), json!(mode.as_str()));
    }
    Value::Object(body)
}

/// Request body for `/context`.
pub fn context_body(query: &str, tokens: u32) -> Value {
    json!({ "query": query, "tokensNum": tokens })
}

/// Parse an Exa search response body into source records.
pub fn parse_results(body: &str) -> Result<Vec<SourceRecord>, ProviderError> {
    let response: ExaSearchResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(response
        .results
        .into_iter()
        .map(|r| {
            let score = r.score.as_ref().and_then(parse_score);
            SourceRecord::new(
                r.title.unwrap_or_default(),
                r.url,
                r.snippet.unwrap_or_default(),
                PROVIDER,
                score,
            )
        })
        .collect())
}

/// Parse a context response. A missing `response` field yields empty text.
pub fn parse_context(body: &str) -> Result<String, ProviderError> {
    let response: ExaContextResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(response.response.unwrap_or_default())
}

/// Exa API client.
pub struct ExaSearchProvider {
    client: reqwest::Client,
    config: ExaConfig,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl ExaSearchProvider {
    pub fn new(config: ExaConfig, api_key: Option<SecretString>, timeout: Duration) -> Self {
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

    async fn post(&self, url: &str, body: &Value) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .header("x-api-key", api_key.expose_secret())
            .bearer_auth(api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))
    }
}

impl SearchProvider for ExaSearchProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn capabilities(&self) -> SearchCapabilities {
        SearchCapabilities {
            lexical: false,
            semantic: true,
            context: true,
        }
    }

    async fn semantic_search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: u32,
    ) -> Result<Vec<SourceRecord>, ProviderError> {
        let body = search_body(query, mode, limit, &self.config.options);
        let text = self.post(&self.config.search_url, &body).await?;
        let records = parse_results(&text)?;
        tracing::debug!(provider = PROVIDER, %mode, results = records.len(), "semantic search done");
        Ok(records)
    }

    async fn context_search(&self, query: &str) -> Result<String, ProviderError> {
        let body = context_body(query, self.config.context_tokens);
        let text = self.post(&self.config.context_url, &body).await?;
        parse_context(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_body_omits_type_for_auto() {
        let body = search_body("graph traversal", SearchMode::Auto, 7, &ProviderOptions::new());
        assert_eq!(
            body,
            json!({"query": "graph traversal", "numResults": 7, "useAutoprompt": true})
        );
    }

    #[test]
    fn test_search_body_merges_options_under_call_fields() {
        let mut options = ProviderOptions::new();
        options.insert("category".to_string(), json!("research paper"));
        options.insert("numResults".to_string(), json!(99));
        options.insert("type".to_string(), json!("keyword"));

        let body = search_body("q", SearchMode::Neural, 3, &options);
        assert_eq!(body["category"], "research paper");
        assert_eq!(body["numResults"], 3);
        assert_eq!(body["type"], "neural");

        let body = search_body("q", SearchMode::Auto, 3, &options);
        assert!(body.get("type").is_none());
    }

    #[test]
    fn test_parse_results_tolerates_nulls() {
        let body = r#"{"results": [
            {"title": null, "url": "https://a", "snippet": "s", "score": 0.42},
            {"title": "B", "url": "https://b"}
        ]}"#;
        let records = parse_results(body).unwrap();
        assert_eq!(records[0].title, "");
        assert_eq!(records[0].score, Some(0.42));
        assert_eq!(records[1].notes, "");
        assert!(records.iter().all(|r| r.provider == "exa"));
    }

    #[test]
    fn test_parse_context() {
        assert_eq!(parse_context(r#"{"response": "fn main() {}"}"#).unwrap(), "fn main() {}");
        assert_eq!(parse_context("{}").unwrap(), "");
        assert!(parse_context("nope").is_err());
    }

    #[test]
    fn test_context_body_uses_token_budget() {
        assert_eq!(
            context_body("tokio select", 1000),
            json!({"query": "tokio select", "tokensNum": 1000})
        );
    }

    #[tokio::test]
    async fn test_missing_key_on_context() {
        let provider = ExaSearchProvider::new(ExaConfig::default(), None, Duration::from_secs(1));
        let err = provider.context_search("q").await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::MissingCredential {
                variable: "EXA_API_KEY".to_string()
            }
        );
    }
}
