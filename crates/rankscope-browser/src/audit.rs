use crate::error::{BrowserError, Result};
use once_cell::sync::Lazy;
use rankscope_core::Category;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score gauges render as the number on one line and the category label on the next.
static GAUGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(\d{1,3})\s*\n\s*(Performance|Accessibility|Best Practices|SEO)\s*$")
        .expect("valid regex")
});

/// Category scores read from a rendered Lighthouse report, on a 0-1 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LighthouseScores {
    pub categories: BTreeMap<Category, f64>,
}

/// Parse the visible text of a PageSpeed Insights report.
///
/// The first gauge per category wins; later matches belong to collapsed
/// sections further down the page.
pub fn parse_lighthouse_text(text: &str) -> Result<LighthouseScores> {
    let mut categories = BTreeMap::new();

    for caps in GAUGE.captures_iter(text) {
        let category = match &caps[2] {
            "Performance" => Category::Performance,
            "Accessibility" => Category::Accessibility,
            "Best Practices" => Category::BestPractices,
            _ => Category::Seo,
        };
        if categories.contains_key(&category) {
            continue;
        }
        let value: u32 = caps[1]
            .parse()
            .map_err(|e| BrowserError::ReportParse(format!("bad gauge value: {e}")))?;
        if value > 100 {
            return Err(BrowserError::ReportParse(format!(
                "{} gauge out of range: {value}",
                category.label()
            )));
        }
        categories.insert(category, f64::from(value) / 100.0);
    }

    if categories.is_empty() {
        return Err(BrowserError::ReportParse(
            "no category gauges found in report text".to_string(),
        ));
    }

    Ok(LighthouseScores { categories })
}
