//! Rankscope LLM - language-model abstraction for content scoring.
//!
//! This crate provides a unified interface over language-model backends and
//! the SEO rubric used to score page content against a keyword.
//!
//! [`LlmProvider`] is the seam; [`GeminiProvider`] talks to Google's
//! `generateContent` endpoint and [`ContentScorer`] turns a page into a
//! rubric prompt and reads the scores back out of the reply. The scorer also
//! writes prose comparisons and audit-aware SEO reports.
//!
//! # Example
//!
//! ```rust,no_run
//! use rankscope_llm::{ContentScorer, GeminiProvider, ScoringInput};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(GeminiProvider::new("api-key")?);
//! let scorer = ContentScorer::new(provider);
//!
//! let reply = scorer
//!     .score(&ScoringInput {
//!         url: "https://example.com/shoes",
//!         keyword: "running shoes",
//!         title: Some("Best running shoes"),
//!         meta_description: None,
//!         headings: &[],
//!         text: "Our guide to running shoes...",
//!     })
//!     .await?;
//!
//! println!("readability: {:?}", reply.dimensions.get("readability"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod provider;
pub mod providers;
pub mod seo;

// Re-export commonly used types
pub use error::{LlmError, Result};
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider};
pub use providers::GeminiProvider;
pub use seo::{ContentScorer, NarrativeReply, ScoreReply, ScoringInput, RUBRIC_DIMENSIONS};
