use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One generated search query plus the intent behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    /// The search query to run.
    pub query: String,
    /// What this query is meant to accomplish and how to take the research further once results are in.
    pub research_goal: String,
}

/// Alternate URL fields a search backend may report for one result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitMetadata {
    #[serde(rename = "sourceURL")]
    pub source_url: Option<String>,
    pub page_url: Option<String>,
    pub final_url: Option<String>,
    pub url: Option<String>,
}

/// A single search result, as returned by a [`crate::WebSearch`] backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: Option<String>,
    pub title: Option<String>,
    /// Extracted markdown body. `None` means the page had no usable content.
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: HitMetadata,
}

impl SearchHit {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// First non-blank of `url`, then `metadata.sourceURL`, `pageUrl`,
    /// `finalUrl`, `url`.
    pub fn resolved_url(&self) -> Option<&str> {
        [
            self.url.as_deref(),
            self.metadata.source_url.as_deref(),
            self.metadata.page_url.as_deref(),
            self.metadata.final_url.as_deref(),
            self.metadata.url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|u| !u.is_empty())
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// One page of search results. An empty `data` is a valid, non-error outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub data: Vec<SearchHit>,
}

/// Learnings and follow-up questions distilled from a batch of search hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DistillResult {
    /// List of learnings, max of the requested count.
    pub learnings: Vec<String>,
    /// List of follow-up questions to research the topic further, max of the requested count.
    pub follow_up_questions: Vec<String>,
}

/// Visited search hits, unique by resolved URL. First-seen wins.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    hits: Vec<SearchHit>,
    urls: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hit unless its URL is already present or it has none.
    pub fn insert(&mut self, hit: SearchHit) -> bool {
        let Some(url) = hit.resolved_url() else {
            return false;
        };
        if !self.urls.insert(url.to_string()) {
            return false;
        }
        self.hits.push(hit);
        true
    }

    pub fn extend(&mut self, hits: impl IntoIterator<Item = SearchHit>) {
        for hit in hits {
            self.insert(hit);
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Resolved URLs in first-seen order.
    pub fn urls(&self) -> Vec<String> {
        self.hits
            .iter()
            .filter_map(|h| h.resolved_url().map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl PartialEq for VisitedSet {
    fn eq(&self, other: &Self) -> bool {
        self.hits == other.hits
    }
}

/// Accumulated output of a research run: unique learnings in insertion
/// order and the sources they came from.
///
/// Merging is idempotent, so a branch that returns its prior state
/// unchanged contributes nothing new when folded back into its parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchResult {
    learnings: Vec<String>,
    seen_learnings: HashSet<String>,
    visited: VisitedSet,
}

impl ResearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        learnings: impl IntoIterator<Item = String>,
        visited: impl IntoIterator<Item = SearchHit>,
    ) -> Self {
        let mut result = Self::new();
        result.extend_learnings(learnings);
        result.visited.extend(visited);
        result
    }

    /// Adds a learning unless it is blank or already present verbatim.
    pub fn push_learning(&mut self, learning: String) -> bool {
        if learning.trim().is_empty() || !self.seen_learnings.insert(learning.clone()) {
            return false;
        }
        self.learnings.push(learning);
        true
    }

    pub fn extend_learnings(&mut self, learnings: impl IntoIterator<Item = String>) {
        for learning in learnings {
            self.push_learning(learning);
        }
    }

    pub fn extend_visited(&mut self, hits: impl IntoIterator<Item = SearchHit>) {
        self.visited.extend(hits);
    }

    pub fn merge(&mut self, other: ResearchResult) {
        self.extend_learnings(other.learnings);
        self.visited.extend(other.visited.hits);
    }

    pub fn learnings(&self) -> &[String] {
        &self.learnings
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn visited_urls(&self) -> Vec<String> {
        self.visited.urls()
    }

    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.visited.is_empty()
    }
}

/// Final Markdown report, with a trailing `## Sources` section when any
/// URLs were visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalReport {
    pub markdown: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with_metadata(metadata: HitMetadata) -> SearchHit {
        SearchHit {
            metadata,
            content: Some("body".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolved_url_prefers_top_level() {
        let hit = SearchHit {
            url: Some("https://a.example".into()),
            metadata: HitMetadata {
                source_url: Some("https://b.example".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(hit.resolved_url(), Some("https://a.example"));
    }

    #[test]
    fn test_resolved_url_fallback_order() {
        let hit = hit_with_metadata(HitMetadata {
            source_url: None,
            page_url: Some("  ".into()),
            final_url: Some("https://final.example".into()),
            url: Some("https://meta.example".into()),
        });
        assert_eq!(hit.resolved_url(), Some("https://final.example"));

        let hit = hit_with_metadata(HitMetadata {
            url: Some("https://meta.example".into()),
            ..Default::default()
        });
        assert_eq!(hit.resolved_url(), Some("https://meta.example"));
    }

    #[test]
    fn test_resolved_url_none() {
        assert_eq!(SearchHit::default().resolved_url(), None);
    }

    #[test]
    fn test_visited_first_seen_wins() {
        let mut visited = VisitedSet::new();
        assert!(visited.insert(SearchHit::new("https://x.example", "first")));
        assert!(!visited.insert(SearchHit::new("https://x.example", "second")));
        assert!(!visited.insert(SearchHit::default()));
        assert_eq!(visited.len(), 1);
        assert_eq!(visited.hits()[0].content.as_deref(), Some("first"));
    }

    #[test]
    fn test_learnings_dedup_preserves_order() {
        let mut result = ResearchResult::new();
        result.extend_learnings(["b".to_string(), "a".into(), "b".into(), " ".into()]);
        assert_eq!(result.learnings(), ["b", "a"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = ResearchResult::from_parts(
            ["one".to_string(), "two".into()],
            [SearchHit::new("https://a.example", "a")],
        );
        let mut merged = base.clone();
        merged.merge(base.clone());
        assert_eq!(merged, base);

        merged.merge(ResearchResult::from_parts(
            ["three".to_string(), "one".into()],
            [SearchHit::new("https://b.example", "b")],
        ));
        assert_eq!(merged.learnings(), ["one", "two", "three"]);
        assert_eq!(
            merged.visited_urls(),
            ["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_distill_result_wire_names() {
        let parsed: DistillResult = serde_json::from_str(
            r#"{"learnings":["l"],"followUpQuestions":["q"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.follow_up_questions, ["q"]);
    }
}
