//! Language scoring through any [`LlmProvider`].

use crate::adapter::LanguageScoringProvider;
use crate::error::Result;
use crate::payload::{AuditPayload, ContentPayload, NarrativePayload, PayloadMeta, ScorePayload};
use async_trait::async_trait;
use rankscope_llm::{ContentScorer, LlmProvider, ScoringInput, RUBRIC_DIMENSIONS};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scores page content with the SEO rubric prompt.
pub struct LlmScoringProvider {
    scorer: ContentScorer,
    source_id: String,
}

impl LlmScoringProvider {
    /// Wrap `provider`, truncating page text to `max_content_chars`.
    pub fn new(provider: Arc<dyn LlmProvider>, max_content_chars: usize) -> Self {
        let source_id = format!("llm-{}", provider.provider_id());
        Self {
            scorer: ContentScorer::new(provider).with_max_content_chars(max_content_chars),
            source_id,
        }
    }
}

fn heading_lines(content: &ContentPayload) -> Vec<String> {
    content
        .headings
        .iter()
        .map(|h| format!("h{}: {}", h.level, h.text))
        .collect()
}

fn scoring_input<'a>(
    content: &'a ContentPayload,
    headings: &'a [String],
    keyword: &'a str,
) -> ScoringInput<'a> {
    ScoringInput {
        url: &content.url,
        keyword,
        title: content.title.as_deref(),
        meta_description: content.meta_description.as_deref(),
        headings,
        text: &content.text,
    }
}

/// `mobile Performance: 62` style lines, one per audited category.
fn audit_lines(audits: &[AuditPayload]) -> Vec<String> {
    audits
        .iter()
        .flat_map(|audit| {
            audit.categories.iter().map(move |(category, score)| {
                format!("{} {}: {:.0}", audit.device, category.label(), score.score * 100.0)
            })
        })
        .collect()
}

#[async_trait]
impl LanguageScoringProvider for LlmScoringProvider {
    async fn score(&self, content: &ContentPayload, keyword: &str) -> Result<ScorePayload> {
        let headings = heading_lines(content);

        tracing::debug!(url = %content.url, keyword, "Scoring page content");
        let reply = self
            .scorer
            .score(&scoring_input(content, &headings, keyword))
            .await?;

        let (dimensions, unrecognized): (BTreeMap<_, _>, BTreeMap<_, _>) = reply
            .dimensions
            .into_iter()
            .partition(|(name, _)| RUBRIC_DIMENSIONS.contains(&name.as_str()));

        let mut meta =
            PayloadMeta::new(&self.source_id).with_extra("model", Value::String(reply.model));
        if !unrecognized.is_empty() {
            tracing::debug!(
                url = %content.url,
                fields = unrecognized.len(),
                "Model returned fields outside the rubric"
            );
            let extra: Map<String, Value> = unrecognized
                .into_iter()
                .map(|(name, value)| (name, Value::from(value)))
                .collect();
            meta = meta.with_extra("unrecognized_dimensions", Value::Object(extra));
        }

        Ok(ScorePayload {
            url: content.url.clone(),
            keyword: keyword.to_string(),
            dimensions,
            recommendations: reply.recommendations,
            summary: reply.summary,
            meta,
        })
    }

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn writes_narratives(&self) -> bool {
        true
    }

    async fn compare(
        &self,
        target: &ContentPayload,
        competitor: &ContentPayload,
        keyword: &str,
    ) -> Result<NarrativePayload> {
        let ours = heading_lines(target);
        let theirs = heading_lines(competitor);

        tracing::debug!(
            url = %target.url,
            competitor = %competitor.url,
            "Comparing page with competitor"
        );
        let reply = self
            .scorer
            .compare(
                &scoring_input(target, &ours, keyword),
                &scoring_input(competitor, &theirs, keyword),
            )
            .await?;

        Ok(NarrativePayload {
            url: target.url.clone(),
            competitor_url: Some(competitor.url.clone()),
            keyword: keyword.to_string(),
            text: reply.text,
            meta: PayloadMeta::new(&self.source_id)
                .with_extra("model", Value::String(reply.model)),
        })
    }

    async fn report(
        &self,
        content: &ContentPayload,
        audits: &[AuditPayload],
        keyword: &str,
    ) -> Result<NarrativePayload> {
        let headings = heading_lines(content);

        tracing::debug!(url = %content.url, audits = audits.len(), "Writing SEO report");
        let reply = self
            .scorer
            .report(
                &scoring_input(content, &headings, keyword),
                &audit_lines(audits),
            )
            .await?;

        Ok(NarrativePayload {
            url: content.url.clone(),
            competitor_url: None,
            keyword: keyword.to_string(),
            text: reply.text,
            meta: PayloadMeta::new(&self.source_id)
                .with_extra("model", Value::String(reply.model)),
        })
    }
}
