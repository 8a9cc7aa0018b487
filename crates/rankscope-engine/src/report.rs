//! Report model and tabular export.

use crate::aggregator::ComparativeSummary;
use crate::error::SelectorWarning;
use crate::normalizer::NormalizedMetric;
use chrono::{DateTime, Utc};
use rankscope_core::{AnalysisRequest, Category, Device, SourceKind, Subject};
use rankscope_sources::SourceError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use uuid::Uuid;

/// Lifecycle of one analysis run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunState {
    Initiated,
    FetchingPrimary,
    SelectingCompetitors,
    FetchingCompetitorData,
    Normalizing,
    Aggregating,
    Completed,
    PartiallyCompleted,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identity of a metric within an entity: category plus device, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub category: Category,
    pub device: Option<Device>,
}

impl MetricKey {
    #[must_use]
    pub fn new(category: Category, device: Option<Device>) -> Self {
        Self { category, device }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device {
            Some(device) => write!(f, "{}:{}", self.category.as_str(), device),
            None => f.write_str(self.category.as_str()),
        }
    }
}

impl std::str::FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, device) = match s.split_once(':') {
            Some((category, device)) => (category, Some(device.parse::<Device>().map_err(|e| e.to_string())?)),
            None => (s, None),
        };
        let category = Category::ALL
            .into_iter()
            .find(|c| c.as_str() == category)
            .ok_or_else(|| format!("unknown category: {category}"))?;
        Ok(Self { category, device })
    }
}

impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MetricKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything measured for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub subject: Subject,
    pub url: String,
    /// Search position, for competitors
    pub rank: Option<u32>,
    pub metrics: BTreeMap<MetricKey, NormalizedMetric>,
    /// Content recommendations in model order
    pub content_findings: Vec<String>,
    pub content_summary: Option<String>,
    /// Model-written analysis: the SEO report for the target, the
    /// head-to-head comparison with the target for a competitor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl EntityReport {
    #[must_use]
    pub fn new(subject: Subject, url: impl Into<String>, rank: Option<u32>) -> Self {
        Self {
            subject,
            url: url.into(),
            rank,
            metrics: BTreeMap::new(),
            content_findings: Vec::new(),
            content_summary: None,
            narrative: None,
        }
    }

    /// Insert a metric, replacing any earlier one with the same key.
    pub fn insert_metric(&mut self, metric: NormalizedMetric) {
        self.metrics.insert(metric.key(), metric);
    }

    #[must_use]
    pub fn metric(&self, category: Category, device: Option<Device>) -> Option<&NormalizedMetric> {
        self.metrics.get(&MetricKey::new(category, device))
    }

    #[must_use]
    pub fn has_performance_metric(&self) -> bool {
        self.metrics
            .keys()
            .any(|k| k.category == Category::Performance && k.device.is_some())
    }

    #[must_use]
    pub fn has_content_metric(&self) -> bool {
        self.metric(Category::Content, None).is_some()
    }
}

/// Why a source contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    Timeout,
    RateLimited,
    AuthFailure,
    UpstreamError,
    MalformedResponse,
    Cancelled,
    /// The payload arrived but could not be mapped onto the common scale
    Normalization,
}

impl From<&SourceError> for FailureReason {
    fn from(err: &SourceError) -> Self {
        match err {
            SourceError::Timeout { .. } => Self::Timeout,
            SourceError::RateLimited { .. } => Self::RateLimited,
            SourceError::AuthFailure { .. } => Self::AuthFailure,
            SourceError::UpstreamError { .. } => Self::UpstreamError,
            SourceError::MalformedResponse { .. } => Self::MalformedResponse,
            SourceError::Cancelled => Self::Cancelled,
        }
    }
}

/// One source that failed for one page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartialFailure {
    pub url: String,
    pub source: SourceKind,
    pub reason: FailureReason,
    pub detail: String,
}

/// Final output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub request: AnalysisRequest,
    /// `Completed` or `PartiallyCompleted`
    pub state: RunState,
    /// Target first, then competitors by search rank
    pub entity_reports: Vec<EntityReport>,
    pub comparative_summary: ComparativeSummary,
    /// Unique per (url, source, reason)
    pub partial_failures: Vec<PartialFailure>,
    pub warnings: Vec<SelectorWarning>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// One flattened metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub url: String,
    pub subject: Subject,
    pub category: Category,
    pub device: Option<Device>,
    pub score: f64,
    pub subscores: BTreeMap<String, f64>,
}

impl AnalysisReport {
    /// The target's report.
    #[must_use]
    pub fn target(&self) -> Option<&EntityReport> {
        self.entity_reports
            .iter()
            .find(|e| e.subject == Subject::Target)
    }

    /// Competitor reports in rank order.
    pub fn competitors(&self) -> impl Iterator<Item = &EntityReport> {
        self.entity_reports
            .iter()
            .filter(|e| e.subject == Subject::Competitor)
    }

    /// One row per entity and metric, in report order.
    #[must_use]
    pub fn to_rows(&self) -> Vec<ReportRow> {
        self.entity_reports
            .iter()
            .flat_map(|entity| {
                entity.metrics.values().map(move |metric| ReportRow {
                    url: entity.url.clone(),
                    subject: entity.subject,
                    category: metric.category,
                    device: metric.device,
                    score: metric.score,
                    subscores: metric.subscores.clone(),
                })
            })
            .collect()
    }

    /// Write the rows as RFC 4180 CSV.
    ///
    /// Columns are `url, subject, category, device, score` followed by the
    /// sorted union of all subscore names; absent values are empty cells.
    pub fn write_csv<W: io::Write>(&self, mut out: W) -> io::Result<()> {
        let rows = self.to_rows();
        let subscore_columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.subscores.keys().map(String::as_str))
            .collect();

        let mut header = vec!["url", "subject", "category", "device", "score"];
        header.extend(subscore_columns.iter().copied());
        write_record(&mut out, header.into_iter().map(ToString::to_string))?;

        for row in &rows {
            let mut record = vec![
                row.url.clone(),
                row.subject.to_string(),
                row.category.as_str().to_string(),
                row.device.map(|d| d.to_string()).unwrap_or_default(),
                format!("{:.1}", row.score),
            ];
            record.extend(subscore_columns.iter().map(|name| {
                row.subscores
                    .get(*name)
                    .map(|v| format!("{v:.1}"))
                    .unwrap_or_default()
            }));
            write_record(&mut out, record.into_iter())?;
        }
        Ok(())
    }

    /// CSV export as a string.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_csv(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_record<W: io::Write>(out: &mut W, fields: impl Iterator<Item = String>) -> io::Result<()> {
    let line = fields.map(|f| quote_field(&f)).collect::<Vec<_>>().join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
