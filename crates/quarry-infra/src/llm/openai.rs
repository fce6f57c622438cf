//! OpenAI-compatible chat-completions provider.
//!
//! Talks to any server exposing `POST {base_url}/chat/completions` (OpenAI,
//! Azure-style proxies, local gateways). Structured output is requested
//! through `response_format: {"type": "json_schema", ...}`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use quarry_core::llm::LlmProvider;
use quarry_types::config::LlmConfig;
use quarry_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: WireJsonSchema<'a>,
}

#[derive(Debug, Serialize)]
struct WireJsonSchema<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Serialize a generic request into the chat-completions body.
///
/// The system prompt becomes the first message. An empty request model
/// falls back to `default_model`.
pub fn request_body(request: &CompletionRequest, default_model: &str) -> serde_json::Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system.as_deref() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system,
        });
    }
    messages.extend(request.messages.iter().map(|m| ChatMessage {
        role: m.role.to_string(),
        content: &m.content,
    }));

    let body = ChatRequest {
        model: if request.model.is_empty() {
            default_model
        } else {
            &request.model
        },
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        response_format: request.response_format.as_ref().map(|f| WireResponseFormat {
            kind: "json_schema",
            json_schema: WireJsonSchema {
                name: &f.name,
                schema: &f.schema,
                strict: f.strict,
            },
        }),
    };
    serde_json::to_value(&body).unwrap_or_default()
}

/// Decode a successful chat-completions body.
pub fn parse_response(body: &str) -> Result<CompletionResponse, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LlmError::Deserialization("response has no choices".to_string()));
    };
    let content = match (choice.message.content, choice.message.refusal) {
        (Some(content), _) => content,
        (None, Some(refusal)) => {
            return Err(LlmError::Provider {
                message: format!("model refused: {refusal}"),
            });
        }
        (None, None) => String::new(),
    };
    let usage = response.usage.unwrap_or_default();

    Ok(CompletionResponse {
        id: response.id,
        content,
        model: response.model,
        usage: Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        },
    })
}

/// Map a non-success status to an [`LlmError`].
pub fn status_error(status: StatusCode, headers: &HeaderMap, body: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000),
        },
        503 | 529 => LlmError::Overloaded(body),
        code => LlmError::Http { status: code, body },
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Chat-completions client for OpenAI-compatible servers.
///
/// Does NOT derive Debug: the API key lives in this struct.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    api_key_env: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &LlmConfig, api_key: Option<SecretString>) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "failed to configure HTTP client, using defaults");
                reqwest::Client::new()
            }
        };

        Self {
            client,
            api_key,
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    /// The default model for this provider.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::InvalidRequest(format!("{} is not set.", self.api_key_env))
        })?;
        let base_url = request.base_url.as_deref().unwrap_or(&self.base_url);
        let body = request_body(request, &self.model);

        let response = self
            .client
            .post(completions_url(base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Provider {
                        message: format!("HTTP request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &headers, error_body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("failed to read response: {e}"),
            })?;
        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_types::llm::{Message, ResponseFormat};
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: String::new(),
            messages: vec![Message::user("Topic: graphs")],
            system: Some("You are a researcher.".to_string()),
            max_tokens: 512,
            temperature: Some(0.2),
            base_url: None,
            response_format: Some(ResponseFormat {
                name: "researcher_output".to_string(),
                schema: json!({"type": "object"}),
                strict: true,
            }),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(&request(), "gpt-4o-mini");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "You are a researcher."}));
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "researcher_output");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_request_body_explicit_model_and_no_format() {
        let mut req = request();
        req.model = "o4-mini".to_string();
        req.response_format = None;
        req.temperature = None;
        let body = request_body(&req, "gpt-4o-mini");
        assert_eq!(body["model"], "o4-mini");
        assert!(body.get("response_format").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"notes\": []}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.content, "{\"notes\": []}");
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 5);
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(matches!(
            parse_response(r#"{"choices": []}"#),
            Err(LlmError::Deserialization(_))
        ));
        assert!(matches!(
            parse_response(r#"{"choices": [{"message": {"content": null, "refusal": "no"}}]}"#),
            Err(LlmError::Provider { .. })
        ));
    }

    #[test]
    fn test_status_mapping() {
        let empty = HeaderMap::new();
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, &empty, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, &empty, "busy".into()),
            LlmError::Overloaded(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, &empty, "bad".into()),
            LlmError::Http { status: 400, .. }
        ));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, &headers, String::new()),
            LlmError::RateLimited { retry_after_ms: Some(3000) }
        ));
    }

    #[test]
    fn test_completions_url_trims_slash() {
        assert_eq!(
            completions_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_permanent() {
        let provider = OpenAiCompatibleProvider::new(&LlmConfig::default(), None);
        let err = provider.complete(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid request: OPENAI_API_KEY is not set.");
        assert!(!err.is_transient());
    }
}
