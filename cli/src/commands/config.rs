//! `rankscope config`

use super::load_config;
use anyhow::{bail, Context, Result};
use rankscope_core::AppConfig;
use std::path::{Path, PathBuf};

/// Print the effective configuration as TOML.
pub fn show(path: Option<&Path>) -> Result<String> {
    let config = load_config(path)?;
    toml::to_string_pretty(&config).context("Failed to serialize config")
}

/// Write the default configuration to `path` (or the default location).
///
/// Refuses to replace an existing file unless `force` is set.
pub fn init(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_path().context("Failed to determine config path")?,
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
