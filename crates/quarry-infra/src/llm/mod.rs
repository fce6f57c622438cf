//! Model provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the
//! [`LlmProvider`](quarry_core::llm::LlmProvider) trait and a factory that
//! builds it from [`LlmConfig`].

pub mod openai;

use quarry_core::llm::BoxLlmProvider;
use quarry_types::config::LlmConfig;

use crate::search::api_key_from_env;

pub use openai::OpenAiCompatibleProvider;

/// Create the configured model provider, reading its key from the
/// environment. A missing key surfaces on the first call, not here.
pub fn create_provider(config: &LlmConfig) -> BoxLlmProvider {
    let api_key = api_key_from_env(&config.api_key_env);
    if api_key.is_none() {
        tracing::warn!(variable = %config.api_key_env, "model API key is not set");
    }
    BoxLlmProvider::new(OpenAiCompatibleProvider::new(config, api_key))
}
