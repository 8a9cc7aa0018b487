//! Configuration management for Rankscope.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Credentials are never part of this file;
//! they are injected by the application shell.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AnalysisOptions, Device};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/rankscope/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default analysis options
    pub analysis: AnalysisConfig,
    /// Retry, timeout and concurrency policy for source calls
    pub governor: GovernorConfig,
    /// Competitor filtering rules
    pub selector: SelectorConfig,
    /// Content scoring rubric
    pub scoring: ScoringConfig,
    /// Provider endpoints and backend selection
    pub providers: ProvidersConfig,
}

impl AppConfig {
    /// Load `config.toml` from the user config directory, or defaults when
    /// there is none yet.
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `RANKSCOPE_COMPETITOR_COUNT`, `RANKSCOPE_MAX_RETRIES` and
    /// `RANKSCOPE_AUDIT_BACKEND` (`pagespeed_api` | `browser`). Unparseable
    /// values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("RANKSCOPE_COMPETITOR_COUNT") {
            if let Ok(count) = val.parse() {
                self.analysis.competitor_count = count;
                tracing::debug!("Override analysis.competitor_count from env: {}", count);
            }
        }

        if let Ok(val) = std::env::var("RANKSCOPE_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.analysis.max_retries = retries;
                tracing::debug!("Override analysis.max_retries from env: {}", retries);
            }
        }

        if let Ok(val) = std::env::var("RANKSCOPE_AUDIT_BACKEND") {
            match val.as_str() {
                "pagespeed_api" => self.providers.audit_backend = AuditBackend::PagespeedApi,
                "browser" => self.providers.audit_backend = AuditBackend::Browser,
                other => tracing::warn!("Ignoring unknown RANKSCOPE_AUDIT_BACKEND '{}'", other),
            }
        }

        self
    }

    /// Write this configuration as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;
        fs::create_dir_all(dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.analysis.devices.is_empty() {
            return Err(invalid("analysis.devices", "at least one device is required"));
        }
        if self.analysis.max_retries == 0 {
            return Err(invalid("analysis.max_retries", "must be at least 1"));
        }
        if self.governor.max_concurrent_per_provider == 0 {
            return Err(invalid(
                "governor.max_concurrent_per_provider",
                "must be at least 1",
            ));
        }
        if self.governor.call_timeout_secs == 0 {
            return Err(invalid("governor.call_timeout_secs", "must be at least 1"));
        }
        if self.governor.max_delay_ms < self.governor.base_delay_ms {
            return Err(invalid(
                "governor.max_delay_ms",
                "must not be smaller than base_delay_ms",
            ));
        }
        self.scoring.validate()
    }

    /// `config.toml` under the platform config directory
    /// (`~/.config/rankscope` on Linux).
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "rankscope", "rankscope").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Default analysis options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of competitors to analyze
    pub competitor_count: usize,
    /// Devices to audit
    pub devices: Vec<Device>,
    /// Cache window in seconds (0 disables caching)
    pub cache_window_secs: u64,
    /// Attempts per source call, including the first
    pub max_retries: u32,
    /// Deadline for a whole run in seconds (0 = none)
    pub run_timeout_secs: u64,
    /// Ask the language model for an SEO report and competitor comparisons
    pub narratives: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            competitor_count: 3,
            devices: Device::ALL.to_vec(),
            cache_window_secs: 900,
            max_retries: 3,
            run_timeout_secs: 0,
            narratives: true,
        }
    }
}

impl AnalysisConfig {
    /// Convert into per-run options.
    #[must_use]
    pub fn to_options(&self) -> AnalysisOptions {
        let mut options = AnalysisOptions::default()
            .with_competitor_count(self.competitor_count)
            .with_devices(self.devices.iter().copied())
            .with_cache_window(Duration::from_secs(self.cache_window_secs))
            .with_max_retries(self.max_retries)
            .with_narratives(self.narratives);
        if self.run_timeout_secs > 0 {
            options = options.with_run_timeout(Duration::from_secs(self.run_timeout_secs));
        }
        options
    }
}

/// Retry, timeout and concurrency policy applied to every source call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// In-flight calls allowed per provider
    pub max_concurrent_per_provider: usize,
    /// First backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Hard timeout per attempt in seconds
    pub call_timeout_secs: u64,
    /// Randomize delays by +/-25%
    pub jitter: bool,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_provider: 4,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            call_timeout_secs: 90,
            jitter: true,
        }
    }
}

/// Rules for discarding search results before competitor selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Substrings that disqualify a result URL
    pub blocked_patterns: Vec<String>,
    /// File extensions that mark a result as non-HTML
    pub blocked_extensions: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            blocked_patterns: [
                "/aclk",
                "googleadservices.com",
                "webcache.googleusercontent.com",
                "google.com/search",
                "google.com/url",
                "translate.google.",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            blocked_extensions: [
                "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "jpg", "jpeg", "png",
                "gif", "svg", "mp3", "mp4", "avi", "mov",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Weights of the content-scoring rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of keyword usage and density
    pub keyword_density: f64,
    /// Weight of heading hierarchy
    pub heading_structure: f64,
    /// Weight of title and meta description
    pub meta_tags: f64,
    /// Weight of readability
    pub readability: f64,
    /// Page text is truncated to this many characters before scoring
    pub max_content_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_density: 0.30,
            heading_structure: 0.25,
            meta_tags: 0.20,
            readability: 0.25,
            max_content_chars: 12_000,
        }
    }
}

impl ScoringConfig {
    /// Rubric dimensions paired with their weights, in rubric order.
    #[must_use]
    pub fn weights(&self) -> [(&'static str, f64); 4] {
        [
            ("keyword_density", self.keyword_density),
            ("heading_structure", self.heading_structure),
            ("meta_tags", self.meta_tags),
            ("readability", self.readability),
        ]
    }

    fn validate(&self) -> ConfigResult<()> {
        for (name, weight) in self.weights() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("scoring.{name}"),
                    reason: "weights must be finite and non-negative".to_string(),
                });
            }
        }
        if self.weights().iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
            return Err(invalid("scoring", "at least one weight must be positive"));
        }
        Ok(())
    }
}

/// Which backend produces performance audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditBackend {
    /// `PageSpeed` Insights REST API
    PagespeedApi,
    /// `PageSpeed` Insights web UI driven through a browser
    Browser,
}

/// Provider endpoints and backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Backend for performance audits
    pub audit_backend: AuditBackend,
    /// `PageSpeed` Insights API endpoint
    pub pagespeed_endpoint: String,
    /// `PageSpeed` Insights web UI used by the browser backend
    pub pagespeed_web_url: String,
    /// Bright Data request API endpoint
    pub brightdata_endpoint: String,
    /// Bright Data zone for search results
    pub serp_zone: String,
    /// Bright Data zone for page unlocking
    pub unlocker_zone: String,
    /// Search engine queried through the SERP zone
    pub search_engine_url: String,
    /// Gemini model used for content scoring
    pub gemini_model: String,
    /// HTTP timeout for provider requests in seconds
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            audit_backend: AuditBackend::PagespeedApi,
            pagespeed_endpoint: "https://www.googleapis.com/pagespeedonline/v5/runPagespeed"
                .to_string(),
            pagespeed_web_url: "https://pagespeed.web.dev/analysis".to_string(),
            brightdata_endpoint: "https://api.brightdata.com/request".to_string(),
            serp_zone: "serp_api1".to_string(),
            unlocker_zone: "web_unlocker1".to_string(),
            search_engine_url: "https://www.google.com/search".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            request_timeout_secs: 60,
        }
    }
}
