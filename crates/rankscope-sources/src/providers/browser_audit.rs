//! Performance audits read from the `PageSpeed` Insights web UI.

use crate::adapter::PerformanceAuditProvider;
use crate::error::Result;
use crate::payload::{AuditPayload, CategoryScore, PayloadMeta};
use async_trait::async_trait;
use rankscope_browser::{parse_lighthouse_text, BrowserEngine};
use rankscope_core::Device;
use std::sync::Arc;

/// Drives `pagespeed.web.dev` in a browser and parses the rendered gauges.
///
/// Only category scores are available this way; subscores stay empty.
pub struct BrowserAuditProvider {
    engine: Arc<BrowserEngine>,
    analysis_url: String,
}

impl BrowserAuditProvider {
    /// Provider using `engine` against the analysis page at `analysis_url`.
    pub fn new(engine: Arc<BrowserEngine>, analysis_url: impl Into<String>) -> Self {
        Self {
            engine,
            analysis_url: analysis_url.into(),
        }
    }
}

#[async_trait]
impl PerformanceAuditProvider for BrowserAuditProvider {
    async fn audit(&self, url: &str, device: Device) -> Result<AuditPayload> {
        let text = self
            .engine
            .lighthouse_report_text(&self.analysis_url, url, device)
            .await?;
        let scores = parse_lighthouse_text(&text)?;

        Ok(AuditPayload {
            url: url.to_string(),
            device,
            categories: scores
                .categories
                .into_iter()
                .map(|(category, score)| (category, CategoryScore::new(score)))
                .collect(),
            meta: PayloadMeta::new(self.source_id()),
        })
    }

    fn source_id(&self) -> &str {
        "pagespeed-web"
    }
}
