//! Rankscope Engine - SEO analysis orchestration.
//!
//! This crate runs an analysis of one target page against its top organic
//! competitors for a keyword. It coordinates the governed source calls,
//! selects competitors from the search results, normalizes every payload to a
//! common 0-100 scale and builds the comparative report.
//!
//! # Features
//!
//! - Concurrent fetching of target audits, content and search results
//! - Deterministic competitor selection with domain deduplication
//! - Partial failures recorded per page and source instead of aborting
//! - Cancellation and optional run timeout
//! - JSON and CSV export of the final report
//!
//! # Example
//!
//! ```rust,ignore
//! use rankscope_engine::{AnalysisEngine, EngineConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = AnalysisEngine::new(audit, search, content, scorer, EngineConfig::default());
//! let report = engine.run(&request, CancellationToken::new()).await?;
//! println!("{}", report.to_csv());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod aggregator;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod normalizer;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod report;
#[allow(missing_docs)]
pub mod selector;

// Re-export commonly used types
pub use aggregator::{
    aggregate, ComparativeSummary, CompetitorDelta, DeviceGap, RadarPoint, RadarSeries,
};
pub use error::{OrchestrationError, Result, SelectorWarning};
pub use normalizer::{round1, Diagnostic, MetricNormalizer, Normalized, NormalizedMetric};
pub use orchestrator::{AnalysisEngine, EngineConfig};
pub use report::{
    AnalysisReport, EntityReport, FailureReason, MetricKey, PartialFailure, ReportRow, RunState,
};
pub use selector::{CompetitorCandidate, CompetitorSelector, Selection};
