//! Configuration loading and validation for PathCoach.
//!
//! Loads configuration from `~/.pathcoach/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.pathcoach/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Conversation loop bounds
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Where the CLI keeps progress and chat history
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Bearer credential for the completion service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sent as `OpenAI-Organization` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-5-mini".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            organization: None,
            model: default_model(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per completion request, counting the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff base when the service gives no `Retry-After`; doubles per attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Delay used when `Retry-After` is present but not a number of seconds
    #[serde(default = "default_unparseable_retry_after_ms")]
    pub unparseable_retry_after_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_unparseable_retry_after_ms() -> u64 {
    800
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            unparseable_retry_after_ms: default_unparseable_retry_after_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default = "default_initial_max_tokens")]
    pub initial_max_tokens: u32,

    #[serde(default = "default_max_tokens_ceiling")]
    pub max_tokens_ceiling: u32,

    /// Prepended to every conversation by the CLI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_rounds() -> u32 {
    4
}
fn default_initial_max_tokens() -> u32 {
    768
}
fn default_max_tokens_ceiling() -> u32 {
    2048
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            initial_max_tokens: default_initial_max_tokens(),
            max_tokens_ceiling: default_max_tokens_ceiling(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Defaults to `~/.pathcoach/data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("retry", &self.retry)
            .field("conversation", &self.conversation)
            .field("storage", &self.storage)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("organization", &self.organization)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.pathcoach/config.toml).
    ///
    /// Environment overrides:
    /// - `PATHCOACH_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `OPENAI_MODEL`, `OPENAI_ORG`
    /// - `PATHCOACH_BASE_URL`, `PATHCOACH_DATA_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("PATHCOACH_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.provider.model = model;
        }
        if let Some(org) = non_empty("OPENAI_ORG") {
            self.provider.organization = Some(org);
        }
        if let Some(url) = non_empty("PATHCOACH_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(dir) = non_empty("PATHCOACH_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pathcoach")
    }

    /// Directory for the CLI's progress and chat files.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("data"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.conversation.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "conversation.max_rounds must be at least 1".into(),
            ));
        }

        if self.conversation.initial_max_tokens == 0
            || self.conversation.initial_max_tokens > self.conversation.max_tokens_ceiling
        {
            return Err(ConfigError::ValidationError(
                "conversation.initial_max_tokens must be between 1 and max_tokens_ceiling".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            retry: RetryConfig::default(),
            conversation: ConversationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
