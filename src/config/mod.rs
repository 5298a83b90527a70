// src/config/mod.rs
// File-based configuration from ~/.mailroom/config.toml with env overrides

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Default cap on concurrently in-flight model calls within one ensemble.
/// Local serving processes usually serialize inference internally, so a
/// small bound loses little latency.
const DEFAULT_MAX_CONCURRENT_MODELS: usize = 3;

/// Top-level config structure
#[derive(Debug, Deserialize, Default)]
pub struct MailroomConfig {
    #[serde(default)]
    pub llm: LlmConfig,
}

/// LLM configuration section
#[derive(Debug, Deserialize, Default)]
pub struct LlmConfig {
    /// Base URL of the local model-serving process
    pub ollama_host: Option<String>,
    /// Cap on concurrently in-flight model calls per ensemble
    pub max_concurrent_models: Option<usize>,
}

impl MailroomConfig {
    /// Load config from ~/.mailroom/config.toml
    pub fn load() -> Self {
        let path = Self::config_path();

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config from file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Get the config file path
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mailroom")
            .join("config.toml")
    }

    /// Ollama base URL: OLLAMA_HOST env var, then config file, then localhost.
    pub fn ollama_host(&self) -> String {
        std::env::var("OLLAMA_HOST")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.llm.ollama_host.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
    }

    /// Concurrency cap for ensemble fan-out (always at least 1).
    pub fn max_concurrent_models(&self) -> usize {
        std::env::var("MAILROOM_MAX_CONCURRENT_MODELS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(self.llm.max_concurrent_models)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_MODELS)
            .max(1)
    }
}
