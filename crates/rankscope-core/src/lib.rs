//! Rankscope Core - Foundation crate for the Rankscope SEO analyzer.
//!
//! This crate provides the shared vocabulary that every other Rankscope crate
//! depends on: request and option types, metric categories and devices,
//! registrable-domain helpers, error types and TOML configuration.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared enums and the validated [`AnalysisRequest`]
//! - [`domain`] - URL and registrable-domain helpers
//!
//! # Example
//!
//! ```rust
//! use rankscope_core::{AnalysisRequest, AppConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let request = AnalysisRequest::new(
//!     "https://example.com/blog/running-shoes",
//!     "running shoes",
//!     config.analysis.to_options(),
//! )?;
//! assert_eq!(request.keyword(), "running shoes");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod domain;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AnalysisConfig, AppConfig, AuditBackend, GovernorConfig, ProvidersConfig, ScoringConfig,
    SelectorConfig,
};
pub use domain::{normalize_page_url, registrable_domain};
pub use error::{ConfigError, ConfigResult, RankscopeError, Result};
pub use types::{AnalysisOptions, AnalysisRequest, Category, Device, SourceKind, Subject};
