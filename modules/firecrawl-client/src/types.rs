use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-call search knobs.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: u32,
    /// Server-side scrape timeout; the HTTP call itself gets a little longer.
    pub timeout: Duration,
    pub formats: Vec<String>,
    pub lang: String,
    pub country: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            timeout: Duration::from_secs(15),
            formats: vec!["markdown".to_string()],
            lang: "en".to_string(),
            country: "us".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
    pub limit: u32,
    /// Milliseconds.
    pub timeout: u64,
    pub tbs: &'a str,
    pub lang: &'a str,
    pub country: &'a str,
    pub location: &'a str,
    #[serde(rename = "scrapeOptions")]
    pub scrape_options: ScrapeOptions<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeOptions<'a> {
    pub formats: &'a [String],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Document>,
    #[serde(default)]
    pub warning: Option<String>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One search result. Which url field is populated depends on whether the
/// page was scraped, redirected, or only listed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, rename = "sourceURL")]
    pub source_url: Option<String>,
    #[serde(default, rename = "pageUrl")]
    pub page_url: Option<String>,
    #[serde(default, rename = "finalUrl")]
    pub final_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "statusCode")]
    pub status_code: Option<u16>,
}
