//! Shared CLI helpers used across multiple command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use echoclaw::config::Config;
use echoclaw::connection::ConnectionManager;
use echoclaw::generator::{ChatCompletionGenerator, ResponseGenerator};

/// Load configuration and check the settings every gateway command needs.
pub(crate) fn load_config() -> Result<Config> {
    let config = Config::load().with_context(|| {
        format!("Failed to load configuration from {}", Config::path().display())
    })?;
    config.validate()?;
    Ok(config)
}

pub(crate) fn build_connection(config: &Config) -> Result<Arc<ConnectionManager>> {
    let connection =
        ConnectionManager::from_config(config).context("Failed to create room gateway client")?;
    Ok(Arc::new(connection))
}

pub(crate) fn build_generator(config: &Config) -> Result<Arc<dyn ResponseGenerator>> {
    if config.generator.api_key.is_none() {
        warn!(
            api_base = %config.generator.api_base,
            "No generator API key configured (set ECHOCLAW_GENERATOR_API_KEY)"
        );
    }
    let generator = ChatCompletionGenerator::from_config(&config.generator)
        .context("Failed to create response generator")?;
    Ok(Arc::new(generator))
}

/// Show at most `max` characters of `text` on one line.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let line = text.replace('\n', " ");
    if line.chars().count() <= max {
        return line;
    }
    let mut out: String = line.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
