//! Validated payloads returned by the source adapters.

use chrono::{DateTime, Utc};
use rankscope_core::{Category, Device, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const UNSCORED_CATEGORIES: &str = "unscoredCategories";

/// Provenance shared by every payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadMeta {
    /// Provider that produced the payload
    pub source_id: String,
    /// When the provider answered
    pub retrieved_at: DateTime<Utc>,
    /// Provider fields without a typed home; kept for reference only
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PayloadMeta {
    /// Stamp a payload from `source_id` retrieved now.
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            retrieved_at: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    /// Attach an extra provider field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Record categories the provider returned without a score.
    #[must_use]
    pub fn with_unscored(self, categories: &[Category]) -> Self {
        if categories.is_empty() {
            return self;
        }
        let names = categories
            .iter()
            .map(|c| serde_json::Value::String(c.as_str().to_string()))
            .collect();
        self.with_extra(UNSCORED_CATEGORIES, serde_json::Value::Array(names))
    }

    /// Categories the provider returned without a score.
    #[must_use]
    pub fn unscored(&self) -> Vec<Category> {
        self.extra
            .get(UNSCORED_CATEGORIES)
            .and_then(serde_json::Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .filter_map(|name| Category::ALL.into_iter().find(|c| c.as_str() == name))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One audited category on the provider's 0-1 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category score, 0-1
    pub score: f64,
    /// Individual audit scores, 0-1
    #[serde(default)]
    pub subscores: BTreeMap<String, f64>,
}

impl CategoryScore {
    /// Score without subscores.
    #[must_use]
    pub fn new(score: f64) -> Self {
        Self {
            score,
            subscores: BTreeMap::new(),
        }
    }
}

/// Performance audit of one page on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPayload {
    /// Audited URL
    pub url: String,
    /// Device the audit emulated
    pub device: Device,
    /// Audited categories
    pub categories: BTreeMap<Category, CategoryScore>,
    /// Provenance
    pub meta: PayloadMeta,
}

/// One organic search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// Result URL
    pub url: String,
    /// 1-based position on the results page
    pub rank: u32,
    /// Result title
    pub title: Option<String>,
    /// Result snippet
    #[serde(default)]
    pub snippet: String,
}

/// Search results for a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    /// Searched keyword
    pub keyword: String,
    /// Organic results in rank order
    pub entries: Vec<SearchEntry>,
    /// Provenance
    pub meta: PayloadMeta,
}

/// A heading on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1-6)
    pub level: u8,
    /// Heading text
    pub text: String,
}

/// Extracted page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPayload {
    /// Page URL
    pub url: String,
    /// Document title
    pub title: Option<String>,
    /// Meta description
    pub meta_description: Option<String>,
    /// Headings in document order
    pub headings: Vec<Heading>,
    /// Main text
    pub text: String,
    /// Provenance
    pub meta: PayloadMeta,
}

/// Language-model rubric scores for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePayload {
    /// Scored page URL
    pub url: String,
    /// Keyword the page was scored against
    pub keyword: String,
    /// Dimension name to raw 0-100 score
    pub dimensions: BTreeMap<String, f64>,
    /// Recommendations in model order
    pub recommendations: Vec<String>,
    /// Optional summary
    pub summary: Option<String>,
    /// Provenance
    pub meta: PayloadMeta,
}

/// Model-written analysis of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativePayload {
    /// Page the analysis is about
    pub url: String,
    /// Page it was compared against, for head-to-head comparisons
    pub competitor_url: Option<String>,
    /// Keyword the analysis targets
    pub keyword: String,
    /// Analysis text
    pub text: String,
    /// Provenance
    pub meta: PayloadMeta,
}

/// Output of any source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SourcePayload {
    /// Performance audit
    PerformanceAudit(AuditPayload),
    /// Search results
    SearchResults(SearchPayload),
    /// Page content
    PageContent(ContentPayload),
    /// Language scoring
    LanguageScore(ScorePayload),
    /// Language-model analysis prose
    Narrative(NarrativePayload),
}

impl SourcePayload {
    /// Source kind of this payload.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::PerformanceAudit(_) => SourceKind::PerformanceAudit,
            Self::SearchResults(_) => SourceKind::SearchResults,
            Self::PageContent(_) => SourceKind::PageContent,
            Self::LanguageScore(_) | Self::Narrative(_) => SourceKind::LanguageScore,
        }
    }

    /// Provenance of this payload.
    #[must_use]
    pub fn meta(&self) -> &PayloadMeta {
        match self {
            Self::PerformanceAudit(p) => &p.meta,
            Self::SearchResults(p) => &p.meta,
            Self::PageContent(p) => &p.meta,
            Self::LanguageScore(p) => &p.meta,
            Self::Narrative(p) => &p.meta,
        }
    }
}
