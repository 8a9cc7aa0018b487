//! Shared types used across Rankscope.
//!
//! These enums are the common vocabulary between the source adapters, the
//! normalizer and the report model. Their declaration order is significant:
//! ordered maps keyed by them drive the report's stable output ordering.

use crate::error::RankscopeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Device profile a performance audit is run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Throttled mobile emulation
    Mobile,
    /// Desktop emulation
    Desktop,
}

impl Device {
    /// Both devices, in report order.
    pub const ALL: [Device; 2] = [Device::Mobile, Device::Desktop];

    /// Lowercase identifier used in provider APIs and exports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Device {
    type Err = RankscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Ok(Device::Mobile),
            "desktop" => Ok(Device::Desktop),
            other => Err(RankscopeError::Validation(format!(
                "unknown device '{other}', expected 'mobile' or 'desktop'"
            ))),
        }
    }
}

/// Metric category on the common 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Lighthouse performance category
    Performance,
    /// Lighthouse accessibility category
    Accessibility,
    /// Lighthouse best-practices category
    BestPractices,
    /// Lighthouse SEO category
    Seo,
    /// Language-model content evaluation
    Content,
}

impl Category {
    /// Every category, in radar-axis order.
    pub const ALL: [Category; 5] = [
        Category::Performance,
        Category::Accessibility,
        Category::BestPractices,
        Category::Seo,
        Category::Content,
    ];

    /// The categories produced by a performance audit.
    pub const AUDIT: [Category; 4] = [
        Category::Performance,
        Category::Accessibility,
        Category::BestPractices,
        Category::Seo,
    ];

    /// Snake-case identifier used in exports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Performance => "performance",
            Category::Accessibility => "accessibility",
            Category::BestPractices => "best_practices",
            Category::Seo => "seo",
            Category::Content => "content",
        }
    }

    /// Human-readable label as shown in Lighthouse reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Performance => "Performance",
            Category::Accessibility => "Accessibility",
            Category::BestPractices => "Best Practices",
            Category::Seo => "SEO",
            Category::Content => "Content",
        }
    }

    /// Whether the category comes from a performance audit (and so is per-device).
    #[must_use]
    pub fn is_audit(self) -> bool {
        !matches!(self, Category::Content)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an entity is the analyzed page or a discovered competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// The page under analysis
    Target,
    /// A page selected from search results
    Competitor,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Target => f.write_str("target"),
            Subject::Competitor => f.write_str("competitor"),
        }
    }
}

/// The four external capabilities the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Lighthouse-style performance audit
    PerformanceAudit,
    /// Search-engine results page
    SearchResults,
    /// Unlocked page content
    PageContent,
    /// Language-model content scoring
    LanguageScore,
}

impl SourceKind {
    /// Every source kind.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::PerformanceAudit,
        SourceKind::SearchResults,
        SourceKind::PageContent,
        SourceKind::LanguageScore,
    ];
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::PerformanceAudit => "PerformanceAudit",
            SourceKind::SearchResults => "SearchResults",
            SourceKind::PageContent => "PageContent",
            SourceKind::LanguageScore => "LanguageScore",
        };
        f.write_str(name)
    }
}

/// Per-run analysis options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Maximum number of competitors to analyze
    pub competitor_count: usize,
    /// Devices to audit (at least one)
    pub devices: BTreeSet<Device>,
    /// Window within which cached source payloads are reused
    #[serde(with = "duration_secs")]
    pub cache_window: Duration,
    /// Total attempts per source call (including the first)
    pub max_retries: u32,
    /// Optional deadline for the whole run
    #[serde(with = "option_duration_secs")]
    pub run_timeout: Option<Duration>,
    /// Request the model-written SEO report and competitor comparisons
    #[serde(default = "enabled")]
    pub narratives: bool,
}

fn enabled() -> bool {
    true
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            competitor_count: 3,
            devices: Device::ALL.into_iter().collect(),
            cache_window: Duration::from_secs(15 * 60),
            max_retries: 3,
            run_timeout: None,
            narratives: true,
        }
    }
}

impl AnalysisOptions {
    /// Set the number of competitors.
    #[must_use]
    pub fn with_competitor_count(mut self, count: usize) -> Self {
        self.competitor_count = count;
        self
    }

    /// Restrict the audited devices.
    #[must_use]
    pub fn with_devices(mut self, devices: impl IntoIterator<Item = Device>) -> Self {
        self.devices = devices.into_iter().collect();
        self
    }

    /// Set the number of attempts per source call.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the cache window.
    #[must_use]
    pub fn with_cache_window(mut self, window: Duration) -> Self {
        self.cache_window = window;
        self
    }

    /// Set a deadline for the whole run.
    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Turn the model-written report and comparisons on or off.
    #[must_use]
    pub fn with_narratives(mut self, narratives: bool) -> Self {
        self.narratives = narratives;
        self
    }

    fn validate(&self) -> Result<(), RankscopeError> {
        if self.devices.is_empty() {
            return Err(RankscopeError::Validation(
                "at least one device must be requested".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(RankscopeError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A validated, immutable analysis request.
///
/// Deserialization runs the same checks as [`AnalysisRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRequest")]
pub struct AnalysisRequest {
    url: String,
    keyword: String,
    options: AnalysisOptions,
}

/// Wire shape of [`AnalysisRequest`] before validation.
#[derive(Deserialize)]
struct UncheckedRequest {
    url: String,
    keyword: String,
    #[serde(default)]
    options: AnalysisOptions,
}

impl TryFrom<UncheckedRequest> for AnalysisRequest {
    type Error = RankscopeError;

    fn try_from(raw: UncheckedRequest) -> Result<Self, Self::Error> {
        Self::new(raw.url, raw.keyword, raw.options)
    }
}

impl AnalysisRequest {
    /// Create a request for `url` ranked against `keyword`.
    ///
    /// # Errors
    /// Returns a validation error if the URL is not an absolute http(s) URL
    /// with a host, if the keyword is blank, or if the options are invalid.
    pub fn new(
        url: impl Into<String>,
        keyword: impl Into<String>,
        options: AnalysisOptions,
    ) -> Result<Self, RankscopeError> {
        let url = url.into().trim().to_string();
        let parsed = Url::parse(&url)
            .map_err(|e| RankscopeError::Validation(format!("invalid URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RankscopeError::Validation(format!(
                "URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(RankscopeError::Validation(format!(
                "URL has no host: '{url}'"
            )));
        }

        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return Err(RankscopeError::Validation(
                "keyword must not be empty".to_string(),
            ));
        }

        options.validate()?;

        Ok(Self {
            url,
            keyword,
            options,
        })
    }

    /// The target page URL, as supplied.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The target keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The run options.
    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod option_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let request =
            AnalysisRequest::new(" https://example.com ", " running shoes ", AnalysisOptions::default())
                .expect("valid request");
        assert_eq!(request.url(), "https://example.com");
        assert_eq!(request.keyword(), "running shoes");
        assert_eq!(request.options().competitor_count, 3);
        assert_eq!(request.options().devices.len(), 2);
    }

    #[test]
    fn test_request_rejects_relative_url() {
        let result = AnalysisRequest::new("/blog/post", "shoes", AnalysisOptions::default());
        assert!(matches!(result, Err(RankscopeError::Validation(_))));
    }

    #[test]
    fn test_request_rejects_non_http_scheme() {
        let result = AnalysisRequest::new("ftp://example.com/a", "shoes", AnalysisOptions::default());
        assert!(matches!(result, Err(RankscopeError::Validation(_))));
    }

    #[test]
    fn test_request_rejects_blank_keyword() {
        let result = AnalysisRequest::new("https://example.com", "   ", AnalysisOptions::default());
        assert!(matches!(result, Err(RankscopeError::Validation(_))));
    }

    #[test]
    fn test_options_require_device_and_attempt() {
        let no_devices = AnalysisOptions::default().with_devices([]);
        assert!(AnalysisRequest::new("https://example.com", "shoes", no_devices).is_err());

        let no_attempts = AnalysisOptions::default().with_max_retries(0);
        assert!(AnalysisRequest::new("https://example.com", "shoes", no_attempts).is_err());
    }

    #[test]
    fn test_category_order_and_labels() {
        assert!(Category::Performance < Category::Seo);
        assert!(Category::Seo < Category::Content);
        assert_eq!(Category::BestPractices.label(), "Best Practices");
        assert_eq!(Category::BestPractices.as_str(), "best_practices");
        assert!(!Category::Content.is_audit());
        assert_eq!(Category::AUDIT.len(), 4);
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("Mobile".parse::<Device>().expect("parse"), Device::Mobile);
        assert_eq!("desktop".parse::<Device>().expect("parse"), Device::Desktop);
        assert!("tablet".parse::<Device>().is_err());
    }

    #[test]
    fn test_options_serialization() {
        let options = AnalysisOptions::default().with_run_timeout(Duration::from_secs(120));
        let json = serde_json::to_string(&options).expect("serialize options");
        assert!(json.contains("\"cache_window\":900"));
        assert!(json.contains("\"run_timeout\":120"));

        let parsed: AnalysisOptions = serde_json::from_str(&json).expect("deserialize options");
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_options_without_narratives_field_enable_them() {
        let json = r#"{"competitor_count": 2, "devices": ["mobile"], "cache_window": 0,
                       "max_retries": 1, "run_timeout": null}"#;
        let parsed: AnalysisOptions = serde_json::from_str(json).expect("deserialize options");
        assert!(parsed.narratives);
        assert!(!parsed.with_narratives(false).narratives);
    }

    #[test]
    fn test_request_deserialization_validates() {
        let request = AnalysisRequest::new(
            "https://example.com/shoes",
            "running shoes",
            AnalysisOptions::default(),
        )
        .expect("valid request");
        let json = serde_json::to_string(&request).expect("serialize request");
        let back: AnalysisRequest = serde_json::from_str(&json).expect("deserialize request");
        assert_eq!(back, request);

        let relative = r#"{"url": "/shoes", "keyword": "running shoes"}"#;
        let err = serde_json::from_str::<AnalysisRequest>(relative).unwrap_err();
        assert!(err.to_string().contains("invalid URL"));

        let blank = r#"{"url": "https://example.com", "keyword": "   "}"#;
        assert!(serde_json::from_str::<AnalysisRequest>(blank).is_err());

        let no_devices = r#"{"url": "https://example.com", "keyword": "shoes",
            "options": {"competitor_count": 3, "devices": [], "cache_window": 900,
                        "max_retries": 3, "run_timeout": null}}"#;
        assert!(serde_json::from_str::<AnalysisRequest>(no_devices).is_err());
    }
}
