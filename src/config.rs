//! Configuration management
//!
//! Loads TOML configuration with CLI overrides. Discovery order: explicit
//! `--config` path, `AETHERMIND_CONFIG` environment variable, a local
//! `aethermind.toml`, then `~/.config/aethermind/config.toml`.

use crate::retrieval::DEFAULT_EMBEDDING_DIM;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub answer: AnswerConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[serde(default = "default_address")]
    pub address: String,
}

/// Retrieval core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Raw rules text file consumed by the offline index builder
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,

    /// Directory holding the persisted index and chunk list pair
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Maximum characters per chunk
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Embedding dimension (must match the persisted index)
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Number of chunks returned when the caller does not specify top_k
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

/// Answer-generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Enable generative answers (also requires the API key to be set)
    #[serde(default = "default_answer_enabled")]
    pub enabled: bool,

    /// Chat-completions endpoint
    #[serde(default = "default_answer_endpoint")]
    pub endpoint: String,

    /// Model name passed to the endpoint
    #[serde(default = "default_answer_model")]
    pub model: String,

    /// Environment variable the API key is read from
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// History logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,

    /// SQLite database path
    #[serde(default = "default_history_db_path")]
    pub db_path: PathBuf,
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("data/rules_raw/comprehensive_rules.txt")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("data/embeddings")
}

fn default_max_chars() -> usize {
    512
}

fn default_embedding_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_top_k() -> usize {
    8
}

fn default_answer_enabled() -> bool {
    true
}

fn default_answer_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_answer_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_history_enabled() -> bool {
    true
}

fn default_history_db_path() -> PathBuf {
    PathBuf::from("data/history/history.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            artifacts_dir: default_artifacts_dir(),
            max_chars: default_max_chars(),
            embedding_dim: default_embedding_dim(),
            default_top_k: default_top_k(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            enabled: default_answer_enabled(),
            endpoint: default_answer_endpoint(),
            model: default_answer_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            db_path: default_history_db_path(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from default locations
    ///
    /// Search order:
    /// 1. AETHERMIND_CONFIG environment variable
    /// 2. ./aethermind.toml (current directory)
    /// 3. ~/.config/aethermind/config.toml (user config)
    pub fn from_default_locations() -> Result<Option<(Self, PathBuf)>> {
        if let Ok(env_path) = std::env::var("AETHERMIND_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                let config = Self::from_file(&path)?;
                return Ok(Some((config, path)));
            }
        }

        let local_path = PathBuf::from("aethermind.toml");
        if local_path.exists() {
            let config = Self::from_file(&local_path)?;
            return Ok(Some((config, local_path)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_path = config_dir.join("aethermind").join("config.toml");
            if user_path.exists() {
                let config = Self::from_file(&user_path)?;
                return Ok(Some((config, user_path)));
            }
        }

        Ok(None)
    }

    /// Generate a template configuration file
    pub fn generate_template() -> String {
        r#"# Aethermind - Rules Retrieval Service Configuration
# Generated template - customize as needed

[server]
# Address to bind the HTTP server to
address = "0.0.0.0:8080"

[retrieval]
# Raw rules text file (blank-line delimited paragraphs)
rules_path = "data/rules_raw/comprehensive_rules.txt"

# Directory for the persisted index + chunk list pair
artifacts_dir = "data/embeddings"

# Maximum characters per chunk (default: 512)
max_chars = 512

# Embedding dimension - must match the persisted index (default: 384)
embedding_dim = 384

# Chunks returned when the caller does not specify top_k (default: 8)
default_top_k = 8

[answer]
# Enable generative answers (the API key must also be set)
enabled = true

# OpenRouter-compatible chat-completions endpoint
endpoint = "https://openrouter.ai/api/v1/chat/completions"

# Model name
model = "openai/gpt-3.5-turbo"

# Environment variable the API key is read from
api_key_env = "OPENROUTER_API_KEY"

[history]
# Log answered questions for later reuse as training data
enabled = true

# SQLite database path
db_path = "data/history/history.db"
"#
        .to_string()
    }

    /// Write template config to the specified path
    pub fn write_template(path: &Path) -> Result<()> {
        let template = Self::generate_template();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        std::fs::write(path, template)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge CLI overrides into the configuration
    pub fn with_overrides(mut self, address: Option<String>) -> Self {
        if let Some(addr) = address {
            self.server.address = addr;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.retrieval.max_chars, 512);
        assert_eq!(config.retrieval.default_top_k, 8);
        assert!(config.history.enabled);
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[server]
address = "127.0.0.1:9000"

[retrieval]
max_chars = 256
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.retrieval.max_chars, 256);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.retrieval.default_top_k, 8);
        assert_eq!(config.answer.model, "openai/gpt-3.5-turbo");
    }

    #[test]
    fn test_generate_template_parses() {
        let template = Config::generate_template();
        let config: Config = toml::from_str(&template).unwrap();
        assert_eq!(config.retrieval.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_with_overrides() {
        let config = Config::default().with_overrides(Some("127.0.0.1:1234".to_string()));
        assert_eq!(config.server.address, "127.0.0.1:1234");
    }
}
