//! Rankscope Sources - uniform access to the external data sources.
//!
//! Every external capability (performance audit, search results, page
//! content, language scoring) is reached through a [`SourceAdapter`] that
//! validates provider output at the boundary. Calls go through the
//! [`Governor`], which applies caching, concurrency limits, per-attempt
//! timeouts and retries with exponential backoff.
//!
//! # Example
//!
//! ```rust,no_run
//! use rankscope_core::{Device, GovernorConfig};
//! use rankscope_sources::{
//!     AuditAdapter, Governor, PageSpeedProvider, SourceRequest,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(PageSpeedProvider::new(
//!     "https://www.googleapis.com/pagespeedonline/v5/runPagespeed",
//!     None,
//!     60,
//! )?);
//! let adapter = AuditAdapter::new(provider);
//! let governor = Governor::new(&GovernorConfig::default(), 3);
//!
//! let payload = governor
//!     .call(
//!         &adapter,
//!         &SourceRequest::Audit {
//!             url: "https://example.com".to_string(),
//!             device: Device::Mobile,
//!         },
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{:?}", payload.kind());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod cache;
pub mod error;
pub mod governor;
pub mod html;
pub mod http;
pub mod payload;
pub mod providers;

// Re-export commonly used types
pub use adapter::{
    AuditAdapter, ContentAdapter, ContentProvider, LanguageScoringProvider,
    PerformanceAuditProvider, ScoreAdapter, SearchAdapter, SearchProvider, SourceAdapter,
    SourceRequest,
};
pub use cache::PayloadCache;
pub use error::{Result, SourceError};
pub use governor::{Governor, ProviderPermits, RetryPolicy};
pub use payload::{
    AuditPayload, CategoryScore, ContentPayload, Heading, NarrativePayload, PayloadMeta,
    ScorePayload, SearchEntry, SearchPayload, SourcePayload,
};
pub use providers::{
    BrightDataSerpProvider, BrightDataUnlockerProvider, BrowserAuditProvider,
    LlmScoringProvider, PageSpeedProvider,
};
