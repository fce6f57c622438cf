//! Configuration loaders for Quarry.
//!
//! Reads `config.toml` and `prompts.yaml` from the data directory
//! (`~/.quarry/` in production). Both fall back to defaults when the file is
//! missing or malformed, so a fresh install runs without any setup.

use std::path::Path;

use quarry_core::stages::AgentPrompts;
use quarry_types::config::QuarryConfig;

pub const CONFIG_FILE: &str = "config.toml";
pub const PROMPTS_FILE: &str = "prompts.yaml";

/// Read a file that may legitimately be absent. `None` means "use defaults".
async fn read_optional(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {} found, using defaults", path.display());
            None
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            None
        }
    }
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`QuarryConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> QuarryConfig {
    let config_path = data_dir.join(CONFIG_FILE);
    let Some(content) = read_optional(&config_path).await else {
        return QuarryConfig::default();
    };

    match toml::from_str::<QuarryConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            QuarryConfig::default()
        }
    }
}

/// Load agent system prompts from `{data_dir}/prompts.yaml`.
///
/// Agents missing from the file keep their built-in prompt.
pub async fn load_prompts(data_dir: &Path) -> AgentPrompts {
    let prompts_path = data_dir.join(PROMPTS_FILE);
    let Some(content) = read_optional(&prompts_path).await else {
        return AgentPrompts::default();
    };

    match AgentPrompts::from_yaml(&content) {
        Ok(prompts) => prompts,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using built-in prompts",
                prompts_path.display()
            );
            AgentPrompts::default()
        }
    }
}
