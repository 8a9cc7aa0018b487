//! Capability traits and the adapters that validate their output.
//!
//! Providers implement one of the four capability traits. Each capability is
//! wrapped by exactly one adapter that turns a [`SourceRequest`] into a call
//! and checks the answer before it is handed to the rest of the system. No
//! partially valid payload ever leaves an adapter.

use crate::error::{Result, SourceError};
use crate::payload::{
    AuditPayload, ContentPayload, NarrativePayload, ScorePayload, SearchPayload, SourcePayload,
};
use async_trait::async_trait;
use rankscope_core::{Device, SourceKind};
use rankscope_llm::RUBRIC_DIMENSIONS;
use std::sync::Arc;

/// Produces Lighthouse-style audits.
#[async_trait]
pub trait PerformanceAuditProvider: Send + Sync {
    /// Audit `url` emulating `device`.
    async fn audit(&self, url: &str, device: Device) -> Result<AuditPayload>;

    /// Stable identifier of this provider.
    fn source_id(&self) -> &str;
}

/// Produces organic search results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `keyword`.
    async fn search(&self, keyword: &str) -> Result<SearchPayload>;

    /// Stable identifier of this provider.
    fn source_id(&self) -> &str;
}

/// Produces the readable content of a page.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch and extract `url`.
    async fn fetch(&self, url: &str) -> Result<ContentPayload>;

    /// Stable identifier of this provider.
    fn source_id(&self) -> &str;
}

/// Scores page content against a keyword.
#[async_trait]
pub trait LanguageScoringProvider: Send + Sync {
    /// Score `content` for `keyword`.
    async fn score(&self, content: &ContentPayload, keyword: &str) -> Result<ScorePayload>;

    /// Stable identifier of this provider.
    fn source_id(&self) -> &str;

    /// Whether [`compare`](Self::compare) and [`report`](Self::report) are
    /// implemented. Providers that only score leave this `false`.
    fn writes_narratives(&self) -> bool {
        false
    }

    /// Head-to-head analysis of `target` against `competitor` for `keyword`.
    async fn compare(
        &self,
        target: &ContentPayload,
        _competitor: &ContentPayload,
        _keyword: &str,
    ) -> Result<NarrativePayload> {
        Err(SourceError::upstream(format!(
            "{} cannot compare {}",
            self.source_id(),
            target.url
        )))
    }

    /// SEO report over `content` and its `audits` for `keyword`.
    async fn report(
        &self,
        content: &ContentPayload,
        _audits: &[AuditPayload],
        _keyword: &str,
    ) -> Result<NarrativePayload> {
        Err(SourceError::upstream(format!(
            "{} cannot write a report for {}",
            self.source_id(),
            content.url
        )))
    }
}

/// A request to one external source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRequest {
    /// Performance audit of a page on a device
    Audit {
        /// Page URL
        url: String,
        /// Emulated device
        device: Device,
    },
    /// Search results for a keyword
    Search {
        /// Keyword
        keyword: String,
    },
    /// Content of a page
    Content {
        /// Page URL
        url: String,
    },
    /// Language scoring of extracted content
    Score {
        /// Content to score
        content: Box<ContentPayload>,
        /// Keyword to score against
        keyword: String,
    },
    /// Head-to-head analysis of two pages
    Compare {
        /// Our page
        target: Box<ContentPayload>,
        /// Competing page
        competitor: Box<ContentPayload>,
        /// Keyword both pages compete for
        keyword: String,
    },
    /// SEO report over a page and its audits
    Report {
        /// Page content
        content: Box<ContentPayload>,
        /// Audits of the same page
        audits: Vec<AuditPayload>,
        /// Target keyword
        keyword: String,
    },
}

impl SourceRequest {
    /// Source kind able to serve this request.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Audit { .. } => SourceKind::PerformanceAudit,
            Self::Search { .. } => SourceKind::SearchResults,
            Self::Content { .. } => SourceKind::PageContent,
            Self::Score { .. } | Self::Compare { .. } | Self::Report { .. } => {
                SourceKind::LanguageScore
            }
        }
    }

    /// Page the request is about; empty for searches. Comparisons are
    /// about the competitor.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Audit { url, .. } | Self::Content { url } => url,
            Self::Score { content, .. } | Self::Report { content, .. } => &content.url,
            Self::Compare { competitor, .. } => &competitor.url,
            Self::Search { .. } => "",
        }
    }

    /// Keyword the request depends on; empty when it does not depend on one.
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::Search { keyword }
            | Self::Score { keyword, .. }
            | Self::Compare { keyword, .. }
            | Self::Report { keyword, .. } => keyword,
            Self::Audit { .. } | Self::Content { .. } => "",
        }
    }

    /// Device for audit requests.
    #[must_use]
    pub fn device(&self) -> Option<Device> {
        match self {
            Self::Audit { device, .. } => Some(*device),
            _ => None,
        }
    }

    /// Whether the answer depends only on the cache key. Narratives are
    /// written fresh for the pages and audits at hand.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Self::Compare { .. } | Self::Report { .. })
    }
}

/// Uniform capability contract over every external source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Kind of source served by this adapter.
    fn kind(&self) -> SourceKind;

    /// Identifier of the wrapped provider.
    fn source_id(&self) -> &str;

    /// Serve `request`, returning only validated payloads.
    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload>;
}

fn wrong_request(expected: SourceKind, request: &SourceRequest) -> SourceError {
    SourceError::upstream(format!(
        "{expected} adapter cannot serve a {} request",
        request.kind()
    ))
}

/// Adapter over a [`PerformanceAuditProvider`].
pub struct AuditAdapter {
    provider: Arc<dyn PerformanceAuditProvider>,
}

impl AuditAdapter {
    /// Wrap `provider`.
    pub fn new(provider: Arc<dyn PerformanceAuditProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SourceAdapter for AuditAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::PerformanceAudit
    }

    fn source_id(&self) -> &str {
        self.provider.source_id()
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        let SourceRequest::Audit { url, device } = request else {
            return Err(wrong_request(self.kind(), request));
        };
        let payload = self.provider.audit(url, *device).await?;
        validate_audit(&payload, *device)?;
        Ok(SourcePayload::PerformanceAudit(payload))
    }
}

/// Adapter over a [`SearchProvider`].
pub struct SearchAdapter {
    provider: Arc<dyn SearchProvider>,
}

impl SearchAdapter {
    /// Wrap `provider`.
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SourceAdapter for SearchAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::SearchResults
    }

    fn source_id(&self) -> &str {
        self.provider.source_id()
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        let SourceRequest::Search { keyword } = request else {
            return Err(wrong_request(self.kind(), request));
        };
        let payload = self.provider.search(keyword).await?;
        validate_search(&payload)?;
        Ok(SourcePayload::SearchResults(payload))
    }
}

/// Adapter over a [`ContentProvider`].
pub struct ContentAdapter {
    provider: Arc<dyn ContentProvider>,
}

impl ContentAdapter {
    /// Wrap `provider`.
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SourceAdapter for ContentAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::PageContent
    }

    fn source_id(&self) -> &str {
        self.provider.source_id()
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        let SourceRequest::Content { url } = request else {
            return Err(wrong_request(self.kind(), request));
        };
        let payload = self.provider.fetch(url).await?;
        validate_content(&payload)?;
        Ok(SourcePayload::PageContent(payload))
    }
}

/// Adapter over a [`LanguageScoringProvider`].
pub struct ScoreAdapter {
    provider: Arc<dyn LanguageScoringProvider>,
}

impl ScoreAdapter {
    /// Wrap `provider`.
    pub fn new(provider: Arc<dyn LanguageScoringProvider>) -> Self {
        Self { provider }
    }

    /// Whether the wrapped provider serves comparison and report requests.
    #[must_use]
    pub fn writes_narratives(&self) -> bool {
        self.provider.writes_narratives()
    }
}

#[async_trait]
impl SourceAdapter for ScoreAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::LanguageScore
    }

    fn source_id(&self) -> &str {
        self.provider.source_id()
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload> {
        match request {
            SourceRequest::Score { content, keyword } => {
                let payload = self.provider.score(content, keyword).await?;
                validate_score(&payload)?;
                Ok(SourcePayload::LanguageScore(payload))
            }
            SourceRequest::Compare {
                target,
                competitor,
                keyword,
            } => {
                let payload = self.provider.compare(target, competitor, keyword).await?;
                validate_narrative(&payload, &target.url)?;
                Ok(SourcePayload::Narrative(payload))
            }
            SourceRequest::Report {
                content,
                audits,
                keyword,
            } => {
                let payload = self.provider.report(content, audits, keyword).await?;
                validate_narrative(&payload, &content.url)?;
                Ok(SourcePayload::Narrative(payload))
            }
            _ => Err(wrong_request(self.kind(), request)),
        }
    }
}

fn validate_audit(payload: &AuditPayload, requested: Device) -> Result<()> {
    if payload.device != requested {
        return Err(SourceError::malformed(format!(
            "requested a {requested} audit but received {}",
            payload.device
        )));
    }
    if payload.categories.is_empty() {
        return Err(SourceError::malformed("audit contains no categories"));
    }
    for (category, score) in &payload.categories {
        if !is_unit(score.score) {
            return Err(SourceError::malformed(format!(
                "{category} score {} is outside [0, 1]",
                score.score
            )));
        }
        if let Some((name, value)) = score.subscores.iter().find(|(_, v)| !is_unit(**v)) {
            return Err(SourceError::malformed(format!(
                "{category} subscore {name} = {value} is outside [0, 1]"
            )));
        }
    }
    Ok(())
}

fn validate_search(payload: &SearchPayload) -> Result<()> {
    let mut previous = 0;
    for entry in &payload.entries {
        if entry.rank <= previous {
            return Err(SourceError::malformed(format!(
                "search ranks are not strictly increasing ({previous} then {})",
                entry.rank
            )));
        }
        previous = entry.rank;
        if url::Url::parse(&entry.url).is_err() {
            return Err(SourceError::malformed(format!(
                "search result URL does not parse: {}",
                entry.url
            )));
        }
    }
    Ok(())
}

fn validate_content(payload: &ContentPayload) -> Result<()> {
    if payload.text.trim().is_empty() && payload.headings.is_empty() {
        return Err(SourceError::malformed(format!(
            "no readable content extracted from {}",
            payload.url
        )));
    }
    Ok(())
}

/// Only rubric dimensions are range-checked; anything else the model sent
/// is ignored downstream.
fn validate_score(payload: &ScorePayload) -> Result<()> {
    if let Some((name, value)) = RUBRIC_DIMENSIONS
        .iter()
        .filter_map(|name| payload.dimensions.get(*name).map(|v| (name, v)))
        .find(|(_, v)| !v.is_finite() || **v < 0.0 || **v > 100.0)
    {
        return Err(SourceError::malformed(format!(
            "dimension {name} = {value} is outside [0, 100]"
        )));
    }
    Ok(())
}

fn validate_narrative(payload: &NarrativePayload, url: &str) -> Result<()> {
    if payload.url != url {
        return Err(SourceError::malformed(format!(
            "narrative is about {} but {url} was requested",
            payload.url
        )));
    }
    if payload.text.trim().is_empty() {
        return Err(SourceError::malformed(format!("empty narrative for {url}")));
    }
    Ok(())
}

fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
