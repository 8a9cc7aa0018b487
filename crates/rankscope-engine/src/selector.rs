//! Competitor selection from search results.

use crate::error::SelectorWarning;
use rankscope_core::{normalize_page_url, registrable_domain, SelectorConfig};
use rankscope_sources::{SearchEntry, SearchPayload};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// A search result chosen for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorCandidate {
    pub url: String,
    pub rank: u32,
    pub title: Option<String>,
    pub snippet: String,
    /// Registrable domain of `url`
    pub domain: String,
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Chosen competitors in rank order
    pub candidates: Vec<CompetitorCandidate>,
    pub warning: Option<SelectorWarning>,
}

/// Picks the top organic competitors for a target page.
#[derive(Debug, Clone)]
pub struct CompetitorSelector {
    blocked_patterns: Vec<String>,
    blocked_extensions: Vec<String>,
}

impl CompetitorSelector {
    #[must_use]
    pub fn new(config: &SelectorConfig) -> Self {
        Self {
            blocked_patterns: config
                .blocked_patterns
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            blocked_extensions: config
                .blocked_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Select up to `count` competitors for `target_url`.
    ///
    /// Results are taken in rank order. Non-http(s) URLs, blocked patterns,
    /// non-HTML documents, the target itself and anything on the target's
    /// registrable domain are skipped, and only the first result per domain
    /// is kept.
    #[must_use]
    pub fn select(&self, results: &SearchPayload, target_url: &str, count: usize) -> Selection {
        let target_page = normalize_page_url(target_url);
        let target_domain = registrable_domain(target_url);

        let mut entries: Vec<&SearchEntry> = results.entries.iter().collect();
        entries.sort_by_key(|e| e.rank);

        let mut seen_domains = HashSet::new();
        let mut candidates = Vec::new();

        for entry in entries {
            if candidates.len() >= count {
                break;
            }
            if !self.is_eligible(&entry.url) {
                continue;
            }
            let Some(domain) = registrable_domain(&entry.url) else {
                continue;
            };
            if target_page.is_some() && normalize_page_url(&entry.url) == target_page {
                continue;
            }
            if target_domain.as_deref() == Some(domain.as_str()) {
                continue;
            }
            if !seen_domains.insert(domain.clone()) {
                continue;
            }
            candidates.push(CompetitorCandidate {
                url: entry.url.clone(),
                rank: entry.rank,
                title: entry.title.clone(),
                snippet: entry.snippet.clone(),
                domain,
            });
        }

        let warning = (candidates.len() < count).then_some(SelectorWarning::InsufficientCompetitors {
            requested: count,
            found: candidates.len(),
        });

        if let Some(ref warning) = warning {
            tracing::warn!("Competitor selection for '{}': {}", results.keyword, warning);
        }

        Selection {
            candidates,
            warning,
        }
    }

    fn is_eligible(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return false;
        }

        let lowered = raw.to_ascii_lowercase();
        if self.blocked_patterns.iter().any(|p| lowered.contains(p)) {
            return false;
        }

        let last_segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match last_segment.rsplit_once('.') {
            Some((_, ext)) => !self.blocked_extensions.iter().any(|b| b == ext),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankscope_sources::PayloadMeta;

    fn results(urls: &[(&str, u32)]) -> SearchPayload {
        SearchPayload {
            keyword: "running shoes".to_string(),
            entries: urls
                .iter()
                .map(|(url, rank)| SearchEntry {
                    url: (*url).to_string(),
                    rank: *rank,
                    title: None,
                    snippet: String::new(),
                })
                .collect(),
            meta: PayloadMeta::new("test"),
        }
    }

    fn selector() -> CompetitorSelector {
        CompetitorSelector::new(&SelectorConfig::default())
    }

    fn urls(selection: &Selection) -> Vec<&str> {
        selection.candidates.iter().map(|c| c.url.as_str()).collect()
    }

    #[test]
    fn test_target_at_rank_one_is_skipped() {
        let payload = results(&[
            ("https://example.com/", 1),
            ("https://runfast.com/shoes", 2),
            ("https://shoezone.net/running", 3),
            ("https://trackgear.org/", 4),
        ]);
        let selection = selector().select(&payload, "https://example.com", 2);

        assert_eq!(
            urls(&selection),
            vec!["https://runfast.com/shoes", "https://shoezone.net/running"]
        );
        assert_eq!(selection.candidates[0].rank, 2);
        assert_eq!(selection.candidates[0].domain, "runfast.com");
        assert!(selection.warning.is_none());
    }

    #[test]
    fn test_target_domain_and_duplicates_dropped() {
        let payload = results(&[
            ("https://blog.example.com/best-shoes", 1),
            ("https://www.runfast.com/a", 2),
            ("https://shop.runfast.com/b", 3),
            ("https://trackgear.co.uk/c", 4),
        ]);
        let selection = selector().select(&payload, "https://www.example.com/shoes", 3);

        assert_eq!(
            urls(&selection),
            vec!["https://www.runfast.com/a", "https://trackgear.co.uk/c"]
        );
        assert_eq!(
            selection.warning,
            Some(SelectorWarning::InsufficientCompetitors {
                requested: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_blocked_results_dropped() {
        let payload = results(&[
            ("https://www.google.com/aclk?sa=l&ai=abc", 1),
            ("https://docs.example.org/guide.PDF", 2),
            ("ftp://files.example.net/shoes", 3),
            ("/relative/path", 4),
            ("https://webcache.googleusercontent.com/search?q=cache:x", 5),
            ("https://runfast.com/guide.html", 6),
        ]);
        let selection = selector().select(&payload, "https://example.com", 3);

        assert_eq!(urls(&selection), vec!["https://runfast.com/guide.html"]);
    }

    #[test]
    fn test_sorted_by_rank() {
        let payload = results(&[
            ("https://third.com/", 3),
            ("https://first.com/", 1),
            ("https://second.com/", 2),
        ]);
        let selection = selector().select(&payload, "https://example.com", 2);

        assert_eq!(urls(&selection), vec!["https://first.com/", "https://second.com/"]);
    }

    #[test]
    fn test_no_candidates_warns() {
        let payload = results(&[("https://example.com/a", 1), ("https://example.com/b", 2)]);
        let selection = selector().select(&payload, "https://example.com", 3);

        assert!(selection.candidates.is_empty());
        assert_eq!(
            selection.warning,
            Some(SelectorWarning::InsufficientCompetitors {
                requested: 3,
                found: 0
            })
        );
    }

    #[test]
    fn test_deterministic() {
        let payload = results(&[
            ("https://a.com/", 1),
            ("https://b.com/", 2),
            ("https://c.com/", 3),
        ]);
        let first = selector().select(&payload, "https://example.com", 3);
        let second = selector().select(&payload, "https://example.com", 3);
        assert_eq!(first, second);
    }
}
