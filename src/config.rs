//! Configuration management for Chatwire
//!
//! Handles loading, parsing, and validating configuration from a YAML file
//! with per-field defaults. The webhook URL can additionally be overridden
//! at runtime by the persisted `webhook_url` setting and by the `--url`
//! flag of the chat command; resolution order is flag > setting > config.

use crate::error::{ChatwireError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Built-in webhook endpoint used when nothing else is configured.
pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/chat";

/// Main configuration structure for Chatwire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Webhook endpoint and retry behavior
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Chat presentation behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Webhook endpoint and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook endpoint URL
    #[serde(default = "default_webhook_url")]
    pub url: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Additional tries beyond the first attempt
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base retry delay in milliseconds; attempt N waits `delay * (N + 1)`.
    /// A linear schedule, not exponential backoff.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_webhook_url() -> String {
    DEFAULT_WEBHOOK_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: default_webhook_url(),
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Chat presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Word-group tokens revealed per simulated-streaming frame
    #[serde(default = "default_stream_chunk_tokens")]
    pub stream_chunk_tokens: usize,

    /// Cosmetic delay between streaming frames in milliseconds
    #[serde(default = "default_stream_delay_ms")]
    pub stream_delay_ms: u64,

    /// Responses longer than this many characters skip simulated streaming
    #[serde(default = "default_skip_stream_over_chars")]
    pub skip_stream_over_chars: usize,
}

fn default_stream_chunk_tokens() -> usize {
    5
}

fn default_stream_delay_ms() -> u64 {
    10
}

fn default_skip_stream_over_chars() -> usize {
    2000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stream_chunk_tokens: default_stream_chunk_tokens(),
            stream_delay_ms: default_stream_delay_ms(),
            skip_stream_over_chars: default_skip_stream_over_chars(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; a present but unparseable file is
    /// an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(ChatwireError::Io)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ChatwireError::Yaml)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.webhook.url).map_err(|e| {
            ChatwireError::Config(format!("invalid webhook URL '{}': {}", self.webhook.url, e))
        })?;

        if self.webhook.timeout_seconds == 0 {
            return Err(ChatwireError::Config("timeout_seconds must be > 0".into()).into());
        }
        if self.webhook.retry_delay_ms == 0 {
            return Err(ChatwireError::Config("retry_delay_ms must be > 0".into()).into());
        }
        if self.chat.stream_chunk_tokens == 0 {
            return Err(ChatwireError::Config("stream_chunk_tokens must be > 0".into()).into());
        }

        Ok(())
    }
}
