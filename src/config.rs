use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable consulted when `[vk] access_token` is empty.
pub const ACCESS_TOKEN_ENV: &str = "VK_ACCESS_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub vk: VkConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VkConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Messages starting with this prefix are treated as commands
    pub prefix: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Backoff applied to transport failures before they are treated as fatal.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_api_version() -> String {
    "5.53".to_string()
}

fn default_base_url() -> String {
    "https://api.vk.com/method".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_max_retries() -> usize {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content, std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    /// Parse and validate a config document. `env_token` fills in an empty
    /// `access_token` so the secret can stay out of the file.
    pub fn from_toml_str(content: &str, env_token: Option<String>) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).context("Failed to parse config file")?;

        if config.vk.access_token.trim().is_empty() {
            if let Some(token) = env_token {
                config.vk.access_token = token;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.vk.access_token.trim().is_empty() {
            anyhow::bail!(
                "No access token specified: set [vk] access_token or {}",
                ACCESS_TOKEN_ENV
            );
        }
        if self.bot.prefix.is_empty() || self.bot.prefix.chars().any(char::is_whitespace) {
            anyhow::bail!(
                "Invalid bot prefix '{}': must be non-empty and contain no whitespace",
                self.bot.prefix
            );
        }
        Ok(())
    }
}
