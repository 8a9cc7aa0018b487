//! SEO content scoring on top of any [`LlmProvider`].
//!
//! The scorer asks the model for a JSON object holding one 0-100 score per
//! rubric dimension plus a list of recommendations, and parses the reply
//! tolerantly: code fences, surrounding prose, nested `scores` objects and
//! numeric strings are all accepted. Dimensions the model omits are simply
//! absent from the reply; deciding what that means is the caller's job.
//!
//! The same scorer also writes free-form prose: a head-to-head comparison of
//! two pages and an SEO report that reads a page together with its audit
//! results. Those replies are returned as text.

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, LlmProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Rubric dimensions the prompt asks for.
pub const RUBRIC_DIMENSIONS: [&str; 4] = [
    "keyword_density",
    "heading_structure",
    "meta_tags",
    "readability",
];

const SYSTEM_PROMPT: &str = "You are a senior SEO content auditor. \
You evaluate a single web page against a target keyword and answer with JSON only.";

const NARRATIVE_SYSTEM_PROMPT: &str = "You are a senior SEO strategist. \
You write concise, specific analyses in plain text with short numbered sections.";

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));

/// Page facts handed to the scorer.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    /// Page URL
    pub url: &'a str,
    /// Target keyword
    pub keyword: &'a str,
    /// Document title
    pub title: Option<&'a str>,
    /// Meta description
    pub meta_description: Option<&'a str>,
    /// Headings, already formatted as `h2: text`
    pub headings: &'a [String],
    /// Main page text
    pub text: &'a str,
}

/// Parsed scoring reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReply {
    /// Dimension name to raw 0-100 score, as reported by the model
    pub dimensions: BTreeMap<String, f64>,
    /// Actionable recommendations, in model order
    pub recommendations: Vec<String>,
    /// One-paragraph summary, if given
    pub summary: Option<String>,
    /// Model that produced the reply
    pub model: String,
}

/// Prose written by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeReply {
    /// Reply text, trimmed
    pub text: String,
    /// Model that produced the reply
    pub model: String,
}

/// Scores page content with a language model.
pub struct ContentScorer {
    provider: Arc<dyn LlmProvider>,
    max_content_chars: usize,
    temperature: f32,
}

impl ContentScorer {
    /// Create a scorer over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            max_content_chars: 12_000,
            temperature: 0.2,
        }
    }

    /// Truncate page text to at most `chars` characters before prompting.
    #[must_use]
    pub fn with_max_content_chars(mut self, chars: usize) -> Self {
        self.max_content_chars = chars;
        self
    }

    /// Identifier of the underlying provider.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    /// Score one page.
    pub async fn score(&self, input: &ScoringInput<'_>) -> Result<ScoreReply> {
        let request = CompletionRequest::new(self.build_prompt(input))
            .with_system_instruction(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_output_tokens(2048)
            .with_json_output();

        let response = self.provider.complete(request).await?;
        tracing::debug!(
            provider = self.provider.provider_id(),
            model = %response.model,
            "Received content score reply"
        );

        let mut reply = parse_reply(&response.text).map_err(|message| LlmError::ParseError {
            provider: self.provider.provider_id().to_string(),
            message,
        })?;
        reply.model = response.model;
        Ok(reply)
    }

    /// Compare `target` with `competitor` for the target's keyword.
    ///
    /// Both pages are truncated to half the content budget each.
    pub async fn compare(
        &self,
        target: &ScoringInput<'_>,
        competitor: &ScoringInput<'_>,
    ) -> Result<NarrativeReply> {
        let budget = self.max_content_chars / 2;
        let prompt = format!(
            "Compare two pages competing for the same search keyword.\n\n\
             Target keyword: {keyword}\n\n\
             Page 1 (ours):\n{ours}\n\n\
             Page 2 (competitor):\n{theirs}\n\n\
             Cover:\n\
             1. Structural advantages and disadvantages of page 1\n\
             2. Content depth and topic coverage\n\
             3. Readability and user experience\n\
             4. On-page SEO patterns the competitor uses that page 1 lacks\n\
             5. Concrete recommendations for page 1",
            keyword = target.keyword,
            ours = page_block(target, budget),
            theirs = page_block(competitor, budget),
        );
        self.narrate(prompt).await
    }

    /// SEO report for one page, reading its content alongside audit results.
    ///
    /// `audits` are preformatted lines such as `mobile performance: 87`.
    pub async fn report(
        &self,
        page: &ScoringInput<'_>,
        audits: &[String],
    ) -> Result<NarrativeReply> {
        let audits = if audits.is_empty() {
            "(no audit results)".to_string()
        } else {
            audits.join("\n")
        };
        let prompt = format!(
            "Write an SEO analysis report for this page.\n\n\
             Target keyword: {keyword}\n\n\
             Audit results (0-100):\n{audits}\n\n\
             Page:\n{page}\n\n\
             Cover:\n\
             1. Performance results and their impact\n\
             2. Accessibility issues and fixes\n\
             3. Best practices compliance\n\
             4. SEO optimization opportunities\n\
             5. The most important improvements, in priority order",
            keyword = page.keyword,
            page = page_block(page, self.max_content_chars),
        );
        self.narrate(prompt).await
    }

    async fn narrate(&self, prompt: String) -> Result<NarrativeReply> {
        let request = CompletionRequest::new(prompt)
            .with_system_instruction(NARRATIVE_SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_output_tokens(4096);

        let response = self.provider.complete(request).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(LlmError::ParseError {
                provider: self.provider.provider_id().to_string(),
                message: "reply is empty".to_string(),
            });
        }
        tracing::debug!(
            provider = self.provider.provider_id(),
            model = %response.model,
            chars = text.len(),
            "Received narrative reply"
        );
        Ok(NarrativeReply {
            text: text.to_string(),
            model: response.model,
        })
    }

    fn build_prompt(&self, input: &ScoringInput<'_>) -> String {
        let text: String = input.text.chars().take(self.max_content_chars).collect();
        let headings = if input.headings.is_empty() {
            "(none)".to_string()
        } else {
            input.headings.join("\n")
        };

        format!(
            "Evaluate the on-page SEO of this page for the target keyword.\n\n\
             Target keyword: {keyword}\n\
             URL: {url}\n\
             Title: {title}\n\
             Meta description: {meta}\n\n\
             Headings:\n{headings}\n\n\
             Page text:\n{text}\n\n\
             Score each dimension from 0 (poor) to 100 (excellent):\n\
             - keyword_density: natural, sufficient use of the keyword and close variants\n\
             - heading_structure: a single clear H1 and a logical H2/H3 hierarchy\n\
             - meta_tags: title and meta description quality and keyword presence\n\
             - readability: clarity, paragraph length and scannability\n\n\
             Reply with a JSON object of this exact shape:\n\
             {{\"keyword_density\": 0, \"heading_structure\": 0, \"meta_tags\": 0, \
             \"readability\": 0, \"recommendations\": [\"...\"], \"summary\": \"...\"}}",
            keyword = input.keyword,
            url = input.url,
            title = input.title.unwrap_or("(missing)"),
            meta = input.meta_description.unwrap_or("(missing)"),
        )
    }
}

fn page_block(input: &ScoringInput<'_>, max_chars: usize) -> String {
    let text: String = input.text.chars().take(max_chars).collect();
    let headings = if input.headings.is_empty() {
        "(none)".to_string()
    } else {
        input.headings.join("\n")
    };
    format!(
        "URL: {url}\nTitle: {title}\nMeta description: {meta}\nHeadings:\n{headings}\nText:\n{text}",
        url = input.url,
        title = input.title.unwrap_or("(missing)"),
        meta = input.meta_description.unwrap_or("(missing)"),
    )
}

/// Parse a model reply into a [`ScoreReply`].
///
/// Returns a description of the problem when no JSON object can be found.
pub fn parse_reply(content: &str) -> std::result::Result<ScoreReply, String> {
    let json_text = extract_json_object(content)
        .ok_or_else(|| "reply does not contain a JSON object".to_string())?;
    let value: serde_json::Value =
        serde_json::from_str(json_text).map_err(|e| format!("invalid JSON in reply: {e}"))?;
    let object = value
        .as_object()
        .ok_or_else(|| "reply JSON is not an object".to_string())?;

    let mut dimensions = BTreeMap::new();
    collect_scores(object, &mut dimensions);
    if let Some(nested) = object.get("scores").and_then(serde_json::Value::as_object) {
        collect_scores(nested, &mut dimensions);
    }

    let recommendations = object
        .get("recommendations")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s.trim().to_string()),
                    serde_json::Value::Object(o) => o
                        .get("text")
                        .or_else(|| o.get("recommendation"))
                        .and_then(serde_json::Value::as_str)
                        .map(|s| s.trim().to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let summary = object
        .get("summary")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(ScoreReply {
        dimensions,
        recommendations,
        summary,
        model: String::new(),
    })
}

fn extract_json_object(content: &str) -> Option<&str> {
    if let Some(captures) = FENCED_JSON.captures(content) {
        return captures.get(1).map(|m| m.as_str());
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn collect_scores(
    object: &serde_json::Map<String, serde_json::Value>,
    into: &mut BTreeMap<String, f64>,
) {
    for (key, value) in object {
        let score = match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
            _ => None,
        };
        if let Some(score) = score {
            into.insert(dimension_key(key), score);
        }
    }
}

fn dimension_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}
