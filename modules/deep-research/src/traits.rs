use std::time::Duration;

use async_trait::async_trait;
use firecrawl_client::{Document, FirecrawlClient, FirecrawlError, SearchOptions};

use crate::error::{ResearchError, Result};
use crate::types::{HitMetadata, SearchHit, SearchPage};

/// Web search + scrape backend. Transient-failure retry is the backend's job.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: u32, timeout: Duration) -> Result<SearchPage>;
}

#[async_trait]
impl WebSearch for FirecrawlClient {
    async fn search(&self, query: &str, limit: u32, timeout: Duration) -> Result<SearchPage> {
        let options = SearchOptions {
            limit,
            timeout,
            ..Default::default()
        };
        match FirecrawlClient::search(self, query, &options).await {
            Ok(response) => Ok(SearchPage {
                data: response.data.into_iter().map(SearchHit::from).collect(),
            }),
            Err(FirecrawlError::Timeout(_)) => Err(ResearchError::SearchTimeout {
                query: query.to_string(),
            }),
            Err(e) => Err(ResearchError::Search {
                query: query.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl From<Document> for SearchHit {
    fn from(doc: Document) -> Self {
        let metadata = doc
            .metadata
            .map(|m| HitMetadata {
                source_url: m.source_url,
                page_url: m.page_url,
                final_url: m.final_url,
                url: m.url,
            })
            .unwrap_or_default();
        SearchHit {
            url: doc.url,
            title: doc.title,
            content: doc.markdown,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firecrawl_client::DocumentMetadata;

    #[test]
    fn test_document_to_hit() {
        let doc = Document {
            url: None,
            title: Some("Grid storage".into()),
            description: Some("ignored".into()),
            markdown: Some("# Grid storage".into()),
            metadata: Some(DocumentMetadata {
                source_url: Some("https://source.example".into()),
                ..Default::default()
            }),
        };
        let hit = SearchHit::from(doc);
        assert_eq!(hit.resolved_url(), Some("https://source.example"));
        assert_eq!(hit.content(), Some("# Grid storage"));
        assert_eq!(hit.title.as_deref(), Some("Grid storage"));
    }

    #[test]
    fn test_document_without_markdown_has_no_content() {
        let doc = Document {
            url: Some("https://a.example".into()),
            title: None,
            description: Some("snippet only".into()),
            markdown: None,
            metadata: None,
        };
        assert_eq!(SearchHit::from(doc).content(), None);
    }
}
