use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vkbot::api::client::VkClient;
use vkbot::api::retry::RetryingApi;
use vkbot::bot::Bot;
use vkbot::commands::register_builtin_commands;
use vkbot::config::Config;
use vkbot::registry::CommandRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vkbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  API: {} (v{})", config.vk.base_url, config.vk.api_version);
    info!("  Prefix: {}", config.bot.prefix);
    info!("  Poll interval: {} ms", config.bot.poll_interval_ms);

    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry).context("Failed to register commands")?;
    info!("  Commands: {}", registry.len());

    let client = VkClient::new(config.vk.clone())?;
    let api = Arc::new(RetryingApi::new(client, config.retry.clone()));

    info!("Bot is starting...");
    let bot = Bot::start(
        api,
        config.bot.prefix.clone(),
        registry,
        Duration::from_millis(config.bot.poll_interval_ms),
    )
    .await?;

    tokio::select! {
        result = bot.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
