//! Cross-entity comparison of normalized metrics.

use crate::normalizer::round1;
use crate::report::{EntityReport, MetricKey};
use rankscope_core::{Category, Device, Subject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Target minus competitor, per shared metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorDelta {
    pub competitor_url: String,
    pub rank: Option<u32>,
    /// Only metrics measured on both sides
    pub deltas: BTreeMap<MetricKey, f64>,
    /// Head-to-head analysis of target against this competitor, if written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<String>,
}

/// One coordinate of a radar series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarPoint {
    pub category: Category,
    pub score: Option<f64>,
}

/// Category scores of one entity on one device, in fixed category order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarSeries {
    pub url: String,
    pub subject: Subject,
    pub device: Device,
    pub values: Vec<RadarPoint>,
}

/// Desktop minus mobile for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGap {
    pub url: String,
    pub subject: Subject,
    pub gaps: BTreeMap<Category, f64>,
}

/// Comparative view over all entity reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparativeSummary {
    pub deltas: Vec<CompetitorDelta>,
    pub radar: Vec<RadarSeries>,
    pub device_gap: Vec<DeviceGap>,
}

/// Build the comparative summary.
///
/// `entities` must already be in report order (target first). The result is
/// a pure function of its input.
#[must_use]
pub fn aggregate(entities: &[EntityReport], devices: &BTreeSet<Device>) -> ComparativeSummary {
    let target = entities.iter().find(|e| e.subject == Subject::Target);

    let deltas = match target {
        Some(target) => entities
            .iter()
            .filter(|e| e.subject == Subject::Competitor)
            .map(|competitor| CompetitorDelta {
                competitor_url: competitor.url.clone(),
                rank: competitor.rank,
                deltas: target
                    .metrics
                    .iter()
                    .filter_map(|(key, ours)| {
                        competitor
                            .metrics
                            .get(key)
                            .map(|theirs| (*key, round1(ours.score - theirs.score)))
                    })
                    .collect(),
                comparison: competitor.narrative.clone(),
            })
            .collect(),
        None => Vec::new(),
    };

    let radar = entities
        .iter()
        .flat_map(|entity| {
            devices.iter().map(move |device| RadarSeries {
                url: entity.url.clone(),
                subject: entity.subject,
                device: *device,
                values: Category::ALL
                    .into_iter()
                    .map(|category| {
                        let device = (category != Category::Content).then_some(*device);
                        RadarPoint {
                            category,
                            score: entity.metric(category, device).map(|m| m.score),
                        }
                    })
                    .collect(),
            })
        })
        .collect();

    let device_gap = entities
        .iter()
        .map(|entity| DeviceGap {
            url: entity.url.clone(),
            subject: entity.subject,
            gaps: Category::AUDIT
                .into_iter()
                .filter_map(|category| {
                    let desktop = entity.metric(category, Some(Device::Desktop))?;
                    let mobile = entity.metric(category, Some(Device::Mobile))?;
                    Some((category, round1(desktop.score - mobile.score)))
                })
                .collect(),
        })
        .filter(|gap| !gap.gaps.is_empty())
        .collect();

    ComparativeSummary {
        deltas,
        radar,
        device_gap,
    }
}
