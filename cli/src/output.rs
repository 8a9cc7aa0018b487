//! Report rendering.

use crate::args::OutputFormat;
use anyhow::Result;
use rankscope_core::{Category, Device};
use rankscope_engine::{AnalysisReport, EntityReport};
use std::fmt::Write as _;

/// Render `report` in `format`.
pub fn render(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)? + "\n",
        OutputFormat::Csv => report.to_csv(),
        OutputFormat::Summary => summary(report),
    })
}

/// Human-readable overview of a report.
#[must_use]
pub fn summary(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let devices: Vec<Device> = report.request.options().devices.iter().copied().collect();

    let _ = writeln!(
        out,
        "Rankscope report for {} (keyword \"{}\")",
        report.request.url(),
        report.request.keyword()
    );
    let _ = writeln!(
        out,
        "Run {} finished {:?} in {}s",
        report.run_id,
        report.state,
        (report.finished_at - report.started_at).num_seconds()
    );
    out.push('\n');

    // Header: one column per audit category and device, then content
    let mut header = format!("{:<4} {:<48}", "#", "Page");
    for category in Category::AUDIT {
        for device in &devices {
            let _ = write!(header, " {:>9}", format!("{}:{}", short_label(category), device_initial(*device)));
        }
    }
    let _ = write!(header, " {:>9}", short_label(Category::Content));
    let _ = writeln!(out, "{header}");

    for entity in &report.entity_reports {
        let _ = writeln!(out, "{}", entity_row(entity, &devices));
    }

    if let Some(target) = report.target() {
        if !target.content_findings.is_empty() {
            let _ = writeln!(out, "\nContent recommendations:");
            for finding in &target.content_findings {
                let _ = writeln!(out, "  - {finding}");
            }
        }
    }

    if let Some(narrative) = report.target().and_then(|t| t.narrative.as_deref()) {
        let _ = writeln!(out, "\nSEO report:\n{}", indent(narrative));
    }

    let gaps: Vec<_> = report
        .comparative_summary
        .deltas
        .iter()
        .filter(|d| !d.deltas.is_empty())
        .collect();
    if !gaps.is_empty() {
        let _ = writeln!(out, "\nTarget vs competitors (positive = target ahead):");
        for delta in gaps {
            let values: Vec<String> = delta
                .deltas
                .iter()
                .map(|(key, value)| format!("{key} {value:+.1}"))
                .collect();
            let _ = writeln!(out, "  {}: {}", delta.competitor_url, values.join(", "));
        }
    }

    for delta in &report.comparative_summary.deltas {
        if let Some(comparison) = &delta.comparison {
            let _ = writeln!(
                out,
                "\nCompared with {}:\n{}",
                delta.competitor_url,
                indent(comparison)
            );
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &report.warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }

    if !report.partial_failures.is_empty() {
        let _ = writeln!(out, "\nUnavailable data:");
        for failure in &report.partial_failures {
            let _ = writeln!(
                out,
                "  - {} [{} / {:?}]: {}",
                failure.url, failure.source, failure.reason, failure.detail
            );
        }
    }

    out
}

fn entity_row(entity: &EntityReport, devices: &[Device]) -> String {
    let rank = entity
        .rank
        .map_or_else(|| "T".to_string(), |r| r.to_string());
    let mut row = format!("{:<4} {:<48}", rank, truncate(&entity.url, 48));
    for category in Category::AUDIT {
        for device in devices {
            let _ = write!(row, " {:>9}", cell(entity, category, Some(*device)));
        }
    }
    let _ = write!(row, " {:>9}", cell(entity, Category::Content, None));
    row
}

fn cell(entity: &EntityReport, category: Category, device: Option<Device>) -> String {
    entity
        .metric(category, device)
        .map_or_else(|| "-".to_string(), |m| format!("{:.1}", m.score))
}

fn short_label(category: Category) -> &'static str {
    match category {
        Category::Performance => "perf",
        Category::Accessibility => "a11y",
        Category::BestPractices => "bp",
        Category::Seo => "seo",
        Category::Content => "content",
    }
}

fn device_initial(device: Device) -> char {
    match device {
        Device::Mobile => 'm',
        Device::Desktop => 'd',
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}
