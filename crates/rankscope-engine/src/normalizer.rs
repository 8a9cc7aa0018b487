//! Mapping of source payloads onto the common 0-100 scale.

use crate::report::MetricKey;
use rankscope_core::{Category, Device, ScoringConfig, SourceKind};
use rankscope_sources::{AuditPayload, ScorePayload, SourcePayload};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A score on the common scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetric {
    pub category: Category,
    /// 0-100, one decimal
    pub score: f64,
    pub subscores: BTreeMap<String, f64>,
    /// `None` for content metrics
    pub device: Option<Device>,
    /// Rubric dimensions that were absent and scored 0
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub missing: BTreeSet<String>,
}

impl NormalizedMetric {
    #[must_use]
    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.category, self.device)
    }
}

/// A value that could not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub source: SourceKind,
    pub category: Option<Category>,
    pub detail: String,
}

/// Metrics plus the values that were rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub metrics: Vec<NormalizedMetric>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Converts payloads into [`NormalizedMetric`]s. Never fails.
#[derive(Debug, Clone)]
pub struct MetricNormalizer {
    weights: [(&'static str, f64); 4],
}

impl MetricNormalizer {
    #[must_use]
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights(),
        }
    }

    /// Normalize one payload. Search results, page content and narratives
    /// yield nothing.
    #[must_use]
    pub fn normalize(&self, payload: &SourcePayload) -> Normalized {
        match payload {
            SourcePayload::PerformanceAudit(audit) => Self::normalize_audit(audit),
            SourcePayload::LanguageScore(score) => self.normalize_score(score),
            SourcePayload::SearchResults(_)
            | SourcePayload::PageContent(_)
            | SourcePayload::Narrative(_) => Normalized::default(),
        }
    }

    fn normalize_audit(audit: &AuditPayload) -> Normalized {
        let mut out = Normalized::default();

        for (category, raw) in &audit.categories {
            if !is_unit(raw.score) {
                out.diagnostics.push(Diagnostic {
                    source: SourceKind::PerformanceAudit,
                    category: Some(*category),
                    detail: format!(
                        "{} score {} is outside [0, 1] ({})",
                        category.label(),
                        raw.score,
                        audit.device
                    ),
                });
                continue;
            }

            let mut subscores = BTreeMap::new();
            for (name, value) in &raw.subscores {
                if is_unit(*value) {
                    subscores.insert(name.clone(), round1(value * 100.0));
                } else {
                    out.diagnostics.push(Diagnostic {
                        source: SourceKind::PerformanceAudit,
                        category: Some(*category),
                        detail: format!(
                            "{} subscore {name} = {value} is outside [0, 1] ({})",
                            category.label(),
                            audit.device
                        ),
                    });
                }
            }

            out.metrics.push(NormalizedMetric {
                category: *category,
                score: round1(raw.score * 100.0),
                subscores,
                device: Some(audit.device),
                missing: BTreeSet::new(),
            });
        }

        for category in audit.meta.unscored() {
            out.diagnostics.push(Diagnostic {
                source: SourceKind::PerformanceAudit,
                category: Some(category),
                detail: format!(
                    "{} was not scored by the audit ({})",
                    category.label(),
                    audit.device
                ),
            });
        }

        out
    }

    fn normalize_score(&self, payload: &ScorePayload) -> Normalized {
        let mut out = Normalized::default();
        let mut subscores = BTreeMap::new();
        let mut missing = BTreeSet::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for (name, weight) in self.weights {
            total_weight += weight;
            match payload.dimensions.get(name) {
                Some(value) if value.is_finite() && (0.0..=100.0).contains(value) => {
                    weighted += weight * value;
                    subscores.insert(name.to_string(), round1(*value));
                }
                Some(value) => {
                    out.diagnostics.push(Diagnostic {
                        source: SourceKind::LanguageScore,
                        category: Some(Category::Content),
                        detail: format!("dimension {name} value {value} is outside [0, 100]"),
                    });
                    missing.insert(name.to_string());
                }
                None => {
                    missing.insert(name.to_string());
                }
            }
        }

        if total_weight <= 0.0 {
            out.diagnostics.push(Diagnostic {
                source: SourceKind::LanguageScore,
                category: Some(Category::Content),
                detail: "rubric weights sum to zero".to_string(),
            });
            return out;
        }

        out.metrics.push(NormalizedMetric {
            category: Category::Content,
            score: round1(weighted / total_weight),
            subscores,
            device: None,
            missing,
        });
        out
    }
}

fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankscope_sources::{CategoryScore, PayloadMeta, SearchPayload};

    fn audit(device: Device, scores: &[(Category, f64)]) -> SourcePayload {
        SourcePayload::PerformanceAudit(AuditPayload {
            url: "https://example.com".to_string(),
            device,
            categories: scores
                .iter()
                .map(|(c, s)| (*c, CategoryScore::new(*s)))
                .collect(),
            meta: PayloadMeta::new("test"),
        })
    }

    fn score(dimensions: &[(&str, f64)]) -> SourcePayload {
        SourcePayload::LanguageScore(ScorePayload {
            url: "https://example.com".to_string(),
            keyword: "running shoes".to_string(),
            dimensions: dimensions
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
            recommendations: vec![],
            summary: None,
            meta: PayloadMeta::new("test"),
        })
    }

    fn normalizer() -> MetricNormalizer {
        MetricNormalizer::new(&ScoringConfig::default())
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(87.04), 87.0);
        assert_eq!(round1(87.06), 87.1);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn test_every_audit_category_yields_one_metric() {
        let payload = audit(
            Device::Mobile,
            &[
                (Category::Performance, 0.873),
                (Category::Accessibility, 1.0),
                (Category::BestPractices, 0.0),
                (Category::Seo, 0.915),
            ],
        );
        let normalized = normalizer().normalize(&payload);

        assert!(normalized.diagnostics.is_empty());
        assert_eq!(normalized.metrics.len(), 4);
        let scores: Vec<f64> = normalized.metrics.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![87.3, 100.0, 0.0, 91.5]);
        assert!(normalized
            .metrics
            .iter()
            .all(|m| m.device == Some(Device::Mobile)));
    }

    #[test]
    fn test_subscores_scaled() {
        let mut categories = BTreeMap::new();
        let mut perf = CategoryScore::new(0.5);
        perf.subscores.insert("speed-index".to_string(), 0.456);
        perf.subscores.insert("broken".to_string(), f64::NAN);
        categories.insert(Category::Performance, perf);
        let payload = SourcePayload::PerformanceAudit(AuditPayload {
            url: "https://example.com".to_string(),
            device: Device::Desktop,
            categories,
            meta: PayloadMeta::new("test"),
        });

        let normalized = normalizer().normalize(&payload);
        let metric = &normalized.metrics[0];
        assert_eq!(metric.subscores.len(), 1);
        assert_eq!(metric.subscores["speed-index"], 45.6);
    }

    #[test]
    fn test_out_of_range_subscore_becomes_diagnostic() {
        let mut categories = BTreeMap::new();
        let mut seo = CategoryScore::new(0.9);
        seo.subscores.insert("document-title".to_string(), 1.0);
        seo.subscores.insert("hreflang".to_string(), 4.2);
        categories.insert(Category::Seo, seo);
        let payload = SourcePayload::PerformanceAudit(AuditPayload {
            url: "https://example.com".to_string(),
            device: Device::Mobile,
            categories,
            meta: PayloadMeta::new("test"),
        });

        let normalized = normalizer().normalize(&payload);

        // The category itself still counts
        assert_eq!(normalized.metrics.len(), 1);
        assert_eq!(normalized.metrics[0].score, 90.0);
        assert_eq!(
            normalized.metrics[0].subscores.keys().collect::<Vec<_>>(),
            vec!["document-title"]
        );
        assert_eq!(normalized.diagnostics.len(), 1);
        assert_eq!(normalized.diagnostics[0].category, Some(Category::Seo));
        assert!(normalized.diagnostics[0].detail.contains("hreflang"));
    }

    #[test]
    fn test_out_of_range_audit_becomes_diagnostic() {
        let payload = audit(
            Device::Desktop,
            &[(Category::Performance, 1.7), (Category::Seo, 0.8)],
        );
        let normalized = normalizer().normalize(&payload);

        assert_eq!(normalized.metrics.len(), 1);
        assert_eq!(normalized.metrics[0].category, Category::Seo);
        assert_eq!(normalized.diagnostics.len(), 1);
        assert_eq!(
            normalized.diagnostics[0].category,
            Some(Category::Performance)
        );
    }

    #[test]
    fn test_unscored_category_becomes_diagnostic() {
        let mut categories = BTreeMap::new();
        categories.insert(Category::Performance, CategoryScore::new(0.8));
        let payload = SourcePayload::PerformanceAudit(AuditPayload {
            url: "https://example.com".to_string(),
            device: Device::Mobile,
            categories,
            meta: PayloadMeta::new("pagespeed").with_unscored(&[Category::BestPractices]),
        });

        let normalized = normalizer().normalize(&payload);

        assert_eq!(normalized.metrics.len(), 1);
        assert_eq!(normalized.diagnostics.len(), 1);
        assert_eq!(
            normalized.diagnostics[0].category,
            Some(Category::BestPractices)
        );
        assert!(normalized.diagnostics[0].detail.contains("not scored"));
    }

    #[test]
    fn test_weighted_content_score() {
        let payload = score(&[
            ("keyword_density", 80.0),
            ("heading_structure", 60.0),
            ("meta_tags", 90.0),
            ("readability", 70.0),
            ("tone", 10.0),
        ]);
        let normalized = normalizer().normalize(&payload);
        let metric = &normalized.metrics[0];

        // 0.30*80 + 0.25*60 + 0.20*90 + 0.25*70 = 74.5
        assert_eq!(metric.score, 74.5);
        assert_eq!(metric.category, Category::Content);
        assert_eq!(metric.device, None);
        assert!(metric.missing.is_empty());
        assert!(!metric.subscores.contains_key("tone"));
    }

    #[test]
    fn test_missing_dimensions_score_zero() {
        let payload = score(&[("keyword_density", 100.0), ("readability", 100.0)]);
        let normalized = normalizer().normalize(&payload);
        let metric = &normalized.metrics[0];

        assert_eq!(metric.score, 55.0);
        assert_eq!(
            metric.missing.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["heading_structure", "meta_tags"]
        );
    }

    #[test]
    fn test_search_payload_yields_nothing() {
        let payload = SourcePayload::SearchResults(SearchPayload {
            keyword: "running shoes".to_string(),
            entries: vec![],
            meta: PayloadMeta::new("test"),
        });
        assert_eq!(normalizer().normalize(&payload), Normalized::default());
    }
}
