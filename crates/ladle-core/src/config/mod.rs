//! Configuration management
//!
//! Loaded once at process start and immutable thereafter; clients and the
//! webhook gateway receive their sections at construction time.

use crate::error::{LadleError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// AI provider configuration (chat completions + embeddings)
    #[serde(default)]
    pub ai: AiServiceConfig,

    /// External workflow webhook configuration
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// RAG execution configuration
    #[serde(default)]
    pub rag: RagConfig,
}

/// AI provider configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServiceConfig {
    /// Base URL of the provider for chat/completions
    pub url: String,

    /// Model name for text chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Model name for vision-capable completions (image attachments)
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Base URL for embeddings (falls back to main URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key for the provider
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl AiServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for AiServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("LADLE_AI_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: default_chat_model(),
            vision_model: default_vision_model(),
            embedding_url: std::env::var("LADLE_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("LADLE_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("LADLE_AI_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

/// External workflow webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Whether the gateway is enabled at all
    #[serde(default = "default_webhook_enabled")]
    pub enabled: bool,

    /// Webhook endpoint URL
    #[serde(default)]
    pub url: Option<String>,

    /// Timeout for standard events in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for recipe-extraction-class events in seconds
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: std::env::var("LADLE_WEBHOOK_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or_else(|_| default_webhook_enabled()),
            url: std::env::var("LADLE_WEBHOOK_URL").ok(),
            timeout_secs: default_timeout(),
            extraction_timeout_secs: default_extraction_timeout(),
        }
    }
}

/// Which backend serves RAG-intent messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RagBackend {
    /// In-process hybrid retrieval engine
    #[default]
    Local,
    /// Delegate to the external workflow engine
    Webhook,
}

/// RAG execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Backend for RAG-intent messages
    #[serde(default)]
    pub backend: RagBackend,
}

fn default_chat_model() -> String {
    std::env::var("LADLE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_vision_model() -> String {
    std::env::var("LADLE_AI_VISION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("LADLE_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "text-embedding-3-small".to_string())
}

fn default_timeout() -> u64 {
    30
}

fn default_extraction_timeout() -> u64 {
    120
}

fn default_webhook_enabled() -> bool {
    false
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to env-based defaults
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Validate startup-time requirements.
    ///
    /// A missing provider credential is a configuration error here, never a
    /// per-request failure.
    pub fn validate(&self) -> Result<()> {
        if self.ai.api_key.as_deref().map_or(true, |k| k.is_empty()) {
            return Err(LadleError::Config(
                "AI provider API key is not set (LADLE_AI_API_KEY or ai.api_key)".to_string(),
            ));
        }
        if self.webhook.enabled && self.webhook.url.as_deref().map_or(true, |u| u.is_empty()) {
            return Err(LadleError::Config(
                "webhook.enabled is set but webhook.url is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config {
            ai: AiServiceConfig {
                api_key: None,
                ..AiServiceConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_webhook_url_required_when_enabled() {
        let config = Config {
            ai: AiServiceConfig {
                api_key: Some("sk-test".to_string()),
                ..AiServiceConfig::default()
            },
            webhook: WebhookConfig {
                enabled: true,
                url: None,
                ..WebhookConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embeddings_url_fallback() {
        let mut ai = AiServiceConfig {
            url: "https://api.example.com".to_string(),
            embedding_url: None,
            ..AiServiceConfig::default()
        };
        assert_eq!(ai.embeddings_url(), "https://api.example.com");
        ai.embedding_url = Some("https://embed.example.com".to_string());
        assert_eq!(ai.embeddings_url(), "https://embed.example.com");
    }
}
