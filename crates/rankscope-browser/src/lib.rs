//! Browser automation engine for PageSpeed Insights.
//!
//! Drives a local or remote Chromium through the public PageSpeed Insights
//! page and turns the rendered Lighthouse report text into category scores.

pub mod audit;
pub mod engine;
pub mod error;

pub use audit::{parse_lighthouse_text, LighthouseScores};
pub use engine::{BrowserEngine, BrowserOptions};
pub use error::{BrowserError, Result};
