//! Subcommand implementations.

pub mod analyze;
pub mod config;

use anyhow::{Context, Result};
use rankscope_core::AppConfig;
use std::path::Path;

/// Exit code for a run that produced no usable data.
pub const EXIT_FAILED: u8 = 1;
/// Exit code for invalid input, configuration or wiring.
pub const EXIT_ERROR: u8 = 2;
/// Exit code for a cancelled or timed-out run.
pub const EXIT_CANCELLED: u8 = 130;

/// Load configuration from `path` or the default location, with environment
/// overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
            .with_env_overrides(),
        None => AppConfig::load()
            .context("Failed to load config")?
            .with_env_overrides(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
