//! Global configuration types for Quarry.
//!
//! `QuarryConfig` represents the top-level `config.toml` in the data
//! directory. Every section and field has a default, so an empty file (or
//! no file at all) yields a working configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::workflow::RetryConfig;

/// Adapter-specific options merged into a provider's request body.
pub type ProviderOptions = BTreeMap<String, serde_json::Value>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarryConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Artifact locations. Relative paths are resolved against the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_memories_dir")]
    pub memories_dir: PathBuf,
    #[serde(default = "default_vault_dir")]
    pub vault_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// SQLite file holding run records and checkpoints.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_memories_dir() -> PathBuf {
    PathBuf::from(".memories")
}

fn default_vault_dir() -> PathBuf {
    PathBuf::from(".vault")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_database() -> PathBuf {
    PathBuf::from("quarry.db")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            memories_dir: default_memories_dir(),
            vault_dir: default_vault_dir(),
            output_dir: default_output_dir(),
            database: default_database(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search limit used by the CLI when `--limit` is not given.
    #[serde(default = "default_search_limit")]
    pub default_limit: u32,
    /// Per-provider timeout for one call, in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default)]
    pub brave: BraveConfig,
    #[serde(default)]
    pub exa: ExaConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_search_limit() -> u32 {
    10
}

fn default_provider_timeout_secs() -> u64 {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            provider_timeout_secs: default_provider_timeout_secs(),
            brave: BraveConfig::default(),
            exa: ExaConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Brave web search (lexical).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BraveConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_brave_url")]
    pub url: String,
    /// Environment variable holding the subscription token.
    #[serde(default = "default_brave_key_env")]
    pub api_key_env: String,
}

fn default_true() -> bool {
    true
}

fn default_brave_url() -> String {
    "https://api.search.brave.com/res/v1/web/search".to_string()
}

fn default_brave_key_env() -> String {
    "BRAVE_SEARCH_API_KEY".to_string()
}

impl Default for BraveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_brave_url(),
            api_key_env: default_brave_key_env(),
        }
    }
}

/// Exa search (semantic + context).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_exa_search_url")]
    pub search_url: String,
    #[serde(default = "default_exa_context_url")]
    pub context_url: String,
    #[serde(default = "default_exa_key_env")]
    pub api_key_env: String,
    /// Token budget requested from the context endpoint.
    #[serde(default = "default_context_tokens")]
    pub context_tokens: u32,
    /// Extra fields merged into every search request body.
    #[serde(default)]
    pub options: ProviderOptions,
}

fn default_exa_search_url() -> String {
    "https://api.exa.ai/search".to_string()
}

fn default_exa_context_url() -> String {
    "https://api.exa.ai/context".to_string()
}

fn default_exa_key_env() -> String {
    "EXA_API_KEY".to_string()
}

fn default_context_tokens() -> u32 {
    1000
}

impl Default for ExaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: default_exa_search_url(),
            context_url: default_exa_context_url(),
            api_key_env: default_exa_key_env(),
            context_tokens: default_context_tokens(),
            options: ProviderOptions::new(),
        }
    }
}

/// Seed URL fetching done by the researcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// Bytes of each page kept as its excerpt.
    #[serde(default = "default_fetch_max_bytes")]
    pub max_bytes: usize,
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_fetch_max_bytes() -> usize {
    2000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_fetch_timeout_secs(),
            max_bytes: default_fetch_max_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat-completions endpoint used by the stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_llm_base_url(),
            temperature: None,
            max_tokens: default_max_tokens(),
            api_key_env: default_llm_key_env(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = QuarryConfig::default();
        assert_eq!(config.paths.memories_dir, PathBuf::from(".memories"));
        assert_eq!(config.paths.vault_dir, PathBuf::from(".vault"));
        assert_eq!(config.paths.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.provider_timeout_secs, 20);
        assert_eq!(config.search.brave.api_key_env, "BRAVE_SEARCH_API_KEY");
        assert_eq!(config.search.exa.context_tokens, 1000);
        assert!(config.search.fetch.enabled);
        assert_eq!(config.search.fetch.timeout_secs, 10);
        assert_eq!(config.search.fetch.max_bytes, 2000);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: QuarryConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.search.exa.enabled);
        assert!(config.search.exa.options.is_empty());
    }

    #[test]
    fn test_config_deserialize_with_values() {
        let toml_str = r#"
[paths]
memories_dir = "/var/lib/quarry/memories"

[search]
provider_timeout_secs = 5

[search.brave]
enabled = false

[search.fetch]
max_bytes = 512

[search.exa.options]
category = "research paper"
includeDomains = ["arxiv.org"]

[retry]
max_attempts = 5
multiplier = 3.0

[llm]
model = "gpt-4.1"
temperature = 0.1
"#;
        let config: QuarryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.paths.memories_dir,
            PathBuf::from("/var/lib/quarry/memories")
        );
        assert_eq!(config.paths.vault_dir, PathBuf::from(".vault"));
        assert_eq!(config.search.provider_timeout_secs, 5);
        assert!(!config.search.brave.enabled);
        assert_eq!(config.search.fetch.max_bytes, 512);
        assert_eq!(config.search.fetch.timeout_secs, 10);
        assert_eq!(
            config.search.exa.options["category"],
            serde_json::json!("research paper")
        );
        assert_eq!(
            config.search.exa.options["includeDomains"],
            serde_json::json!(["arxiv.org"])
        );
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.temperature, Some(0.1));
    }
}
