//! HTML extraction for search result pages and unlocked content pages.

use crate::payload::{Heading, SearchEntry};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static RESULT_BLOCK: Lazy<Selector> = Lazy::new(|| selector("div.g"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static RESULT_TITLE: Lazy<Selector> = Lazy::new(|| selector("h3"));
static RESULT_SNIPPET: Lazy<Selector> = Lazy::new(|| selector("div.VwiC3b"));

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[name="description"], meta[property="og:description"]"#));
static HEADINGS: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3"));
static CONTAINER_GROUPS: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        selector("main"),
        selector("article"),
        selector("div.content, div.main, div.body"),
    ]
});
static FALLBACK_BLOCKS: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, p"));

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Readable parts of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Document title
    pub title: Option<String>,
    /// Meta description
    pub meta_description: Option<String>,
    /// h1-h3 headings in document order
    pub headings: Vec<Heading>,
    /// Main text, whitespace-collapsed
    pub text: String,
}

/// Parse organic results from a Google results page.
///
/// Each `div.g` block contributes its first absolute link. Ad redirects are
/// skipped and repeated URLs (nested blocks) keep their first position.
/// Ranks are assigned 1, 2, 3... in page order.
#[must_use]
pub fn parse_serp(html: &str) -> Vec<SearchEntry> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for block in document.select(&RESULT_BLOCK) {
        let Some(href) = block
            .select(&LINK)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| href.starts_with("http://") || href.starts_with("https://"))
        else {
            continue;
        };
        if href.contains("aclk") || !seen.insert(href.to_string()) {
            continue;
        }

        let title = block
            .select(&RESULT_TITLE)
            .next()
            .map(visible_text)
            .filter(|t| !t.is_empty());
        let snippet = block
            .select(&RESULT_SNIPPET)
            .next()
            .map(visible_text)
            .unwrap_or_default();

        entries.push(SearchEntry {
            url: href.to_string(),
            rank: u32::try_from(entries.len() + 1).unwrap_or(u32::MAX),
            title,
            snippet,
        });
    }

    entries
}

/// Extract title, description, headings and main text from a page.
#[must_use]
pub fn extract_content(html: &str) -> ExtractedContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(visible_text)
        .filter(|t| !t.is_empty());
    let meta_description = document
        .select(&META_DESCRIPTION)
        .filter_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .find(|d| !d.is_empty());

    let headings = document
        .select(&HEADINGS)
        .filter_map(|h| {
            let level = h.value().name()[1..].parse::<u8>().ok()?;
            let text = visible_text(h);
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect();

    ExtractedContent {
        title,
        meta_description,
        headings,
        text: main_text(&document),
    }
}

fn main_text(document: &Html) -> String {
    for group in CONTAINER_GROUPS.iter() {
        let containers: Vec<ElementRef<'_>> = document.select(group).collect();
        if containers.is_empty() {
            continue;
        }
        let ids: HashSet<_> = containers.iter().map(|c| c.id()).collect();
        let text = containers
            .iter()
            .filter(|c| !c.ancestors().any(|a| ids.contains(&a.id())))
            .map(|c| visible_text(*c))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            return text;
        }
    }

    document
        .select(&FALLBACK_BLOCKS)
        .map(visible_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of `element` without script/style content, whitespace-collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }
    collapse_whitespace(&raw)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
