//! Concrete providers behind the capability traits.

pub mod brightdata;
pub mod browser_audit;
pub mod pagespeed;
pub mod scoring;

pub use brightdata::{BrightDataSerpProvider, BrightDataUnlockerProvider};
pub use browser_audit::BrowserAuditProvider;
pub use pagespeed::PageSpeedProvider;
pub use scoring::LlmScoringProvider;
