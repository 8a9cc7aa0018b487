//! `PageSpeed` Insights v5 API provider.

use crate::adapter::PerformanceAuditProvider;
use crate::error::{Result, SourceError};
use crate::http::{build_client, check_response, error_for_transport};
use crate::payload::{AuditPayload, CategoryScore, PayloadMeta};
use async_trait::async_trait;
use rankscope_core::{Category, Device};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const SOURCE_ID: &str = "pagespeed-api";

/// Lighthouse audits through the `PageSpeed` Insights `runPagespeed` API.
pub struct PageSpeedProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PageSpeedProvider {
    /// Provider calling `endpoint`, optionally with an API key.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl PerformanceAuditProvider for PageSpeedProvider {
    async fn audit(&self, url: &str, device: Device) -> Result<AuditPayload> {
        let mut query: Vec<(&str, &str)> = vec![("url", url), ("strategy", device.as_str())];
        query.extend(
            Category::AUDIT
                .iter()
                .map(|c| ("category", api_category(*c))),
        );
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        tracing::debug!(url, device = %device, "Requesting PageSpeed audit");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| error_for_transport(&e))?;
        let body: PsiResponse = check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::malformed(format!("PageSpeed response: {e}")))?;

        Ok(into_payload(body, url, device))
    }

    fn source_id(&self) -> &str {
        SOURCE_ID
    }
}

fn api_category(category: Category) -> &'static str {
    match category {
        Category::Performance => "performance",
        Category::Accessibility => "accessibility",
        Category::BestPractices => "best-practices",
        Category::Seo | Category::Content => "seo",
    }
}

fn into_payload(body: PsiResponse, url: &str, device: Device) -> AuditPayload {
    let lighthouse = body.lighthouse_result;
    let mut categories = BTreeMap::new();
    let mut unscored = Vec::new();

    for category in Category::AUDIT {
        let Some(entry) = lighthouse.categories.get(api_category(category)) else {
            continue;
        };
        // A null score means Lighthouse could not compute the category.
        let Some(score) = entry.score else {
            tracing::debug!(url, %device, "Lighthouse returned no {} score", category.label());
            unscored.push(category);
            continue;
        };
        let subscores = entry
            .audit_refs
            .iter()
            .filter(|r| r.weight > 0.0)
            .filter_map(|r| {
                let audit_score = lighthouse.audits.get(&r.id)?.score?;
                Some((r.id.clone(), audit_score))
            })
            .collect();
        categories.insert(category, CategoryScore { score, subscores });
    }

    let mut meta = PayloadMeta::new(SOURCE_ID).with_unscored(&unscored);
    if let Some(version) = lighthouse.lighthouse_version {
        meta = meta.with_extra("lighthouseVersion", serde_json::Value::String(version));
    }
    if let Some(final_url) = lighthouse.final_displayed_url.or(lighthouse.final_url) {
        meta = meta.with_extra("finalUrl", serde_json::Value::String(final_url));
    }

    AuditPayload {
        url: url.to_string(),
        device,
        categories,
        meta,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PsiResponse {
    lighthouse_result: LighthouseResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LighthouseResult {
    #[serde(default)]
    categories: HashMap<String, PsiCategory>,
    #[serde(default)]
    audits: HashMap<String, PsiAudit>,
    lighthouse_version: Option<String>,
    final_url: Option<String>,
    final_displayed_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PsiCategory {
    score: Option<f64>,
    #[serde(default)]
    audit_refs: Vec<PsiAuditRef>,
}

#[derive(Debug, Deserialize)]
struct PsiAuditRef {
    id: String,
    #[serde(default)]
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct PsiAudit {
    score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PsiResponse {
        serde_json::from_value(serde_json::json!({
            "lighthouseResult": {
                "lighthouseVersion": "12.2.1",
                "finalDisplayedUrl": "https://example.com/",
                "categories": {
                    "performance": {
                        "score": 0.87,
                        "auditRefs": [
                            {"id": "largest-contentful-paint", "weight": 25},
                            {"id": "speed-index", "weight": 10},
                            {"id": "diagnostics", "weight": 0},
                            {"id": "interactive", "weight": 10}
                        ]
                    },
                    "accessibility": {"score": 0.92, "auditRefs": []},
                    "best-practices": {"score": null},
                    "seo": {"score": 1.0}
                },
                "audits": {
                    "largest-contentful-paint": {"score": 0.75},
                    "speed-index": {"score": 0.9},
                    "diagnostics": {"score": 0.1},
                    "interactive": {"score": null}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_into_payload_categories() {
        let payload = into_payload(sample(), "https://example.com", Device::Mobile);

        assert_eq!(payload.device, Device::Mobile);
        assert_eq!(payload.categories.len(), 3);
        assert_eq!(payload.categories[&Category::Performance].score, 0.87);
        assert_eq!(payload.categories[&Category::Seo].score, 1.0);
        assert!(!payload.categories.contains_key(&Category::BestPractices));
        assert_eq!(payload.meta.unscored(), vec![Category::BestPractices]);
        assert_eq!(
            payload.meta.extra["finalUrl"],
            serde_json::json!("https://example.com/")
        );
    }

    #[test]
    fn test_into_payload_subscores() {
        let payload = into_payload(sample(), "https://example.com", Device::Desktop);
        let subscores = &payload.categories[&Category::Performance].subscores;

        assert_eq!(subscores.len(), 2);
        assert_eq!(subscores["largest-contentful-paint"], 0.75);
        assert_eq!(subscores["speed-index"], 0.9);
        assert!(!subscores.contains_key("diagnostics"));
        assert!(!subscores.contains_key("interactive"));
    }

    #[test]
    fn test_api_category_names() {
        assert_eq!(api_category(Category::BestPractices), "best-practices");
        assert_eq!(api_category(Category::Seo), "seo");
    }
}
