//! Structured output helpers.
//!
//! Stages ask the model for JSON matching a `schemars`-generated schema and
//! decode the answer back into the same Rust type.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use quarry_types::llm::ResponseFormat;

/// Build a strict JSON-schema response format for `T`.
pub fn response_format<T: JsonSchema>(name: &str) -> ResponseFormat {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
    close_objects(&mut schema);
    ResponseFormat {
        name: name.to_string(),
        schema,
        strict: true,
    }
}

/// Set `additionalProperties: false` on every object schema.
///
/// Strict structured output rejects schemas that leave objects open.
fn close_objects(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type").and_then(|t| t.as_str()) == Some("object") {
                map.insert(
                    "additionalProperties".to_string(),
                    serde_json::Value::Bool(false),
                );
            }
            for child in map.values_mut() {
                close_objects(child);
            }
        }
        serde_json::Value::Array(items) => {
            for child in items {
                close_objects(child);
            }
        }
        _ => {}
    }
}

/// Decode model output into `T`.
///
/// Accepts bare JSON or JSON wrapped in a markdown code fence.
pub fn parse_output<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(content))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
