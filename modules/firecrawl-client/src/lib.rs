pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::{Document, DocumentMetadata, SearchOptions, SearchResponse};

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};
use types::{ScrapeOptions, SearchRequest};

const BASE_URL: &str = "https://api.firecrawl.dev/v1";

/// Extra time the HTTP call gets on top of the server-side scrape timeout.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Statuses worth retrying: rate limiting and transient upstream failures.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Constant backoff: a short first wait, then a longer fixed wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub first_delay: Duration,
    pub later_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            first_delay: Duration::from_secs(3),
            later_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            self.first_delay
        } else {
            self.later_delay
        }
    }
}

pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl FirecrawlClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search the web and scrape the top results.
    ///
    /// Rate limits and 5xx responses are retried per the [`RetryPolicy`].
    /// A response with `success: false` comes back as an empty result set
    /// rather than an error.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let query = clean_query(query)?;
        let url = format!("{}/search", self.base_url);
        let request = SearchRequest {
            query,
            limit: options.limit,
            timeout: options.timeout.as_millis() as u64,
            tbs: "",
            lang: &options.lang,
            country: &options.country,
            location: "",
            scrape_options: ScrapeOptions {
                formats: &options.formats,
            },
        };
        let call_timeout = options.timeout + TIMEOUT_GRACE;

        debug!(query, limit = options.limit, "Firecrawl search request");

        let mut retry = 0;
        loop {
            let sent = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .timeout(call_timeout)
                .json(&request)
                .send()
                .await;

            let resp = match sent {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() => return Err(FirecrawlError::Timeout(call_timeout)),
                Err(e) if e.is_connect() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay(retry);
                    warn!(query, retry = retry + 1, delay_secs = delay.as_secs(), error = %e, "Firecrawl connect failed, retrying");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if is_retryable(status) && retry < self.retry.max_retries {
                let delay = self.retry.delay(retry);
                warn!(
                    query,
                    status = status.as_u16(),
                    retry = retry + 1,
                    delay_secs = delay.as_secs(),
                    "Firecrawl transient error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
                continue;
            }

            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(FirecrawlError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: SearchResponse = resp.json().await.map_err(|e| {
                if e.is_timeout() {
                    FirecrawlError::Timeout(call_timeout)
                } else {
                    FirecrawlError::from(e)
                }
            })?;

            if !body.success {
                warn!(query, warning = ?body.warning, "Firecrawl search unsuccessful, treating as empty");
                return Ok(SearchResponse::empty());
            }

            debug!(query, count = body.data.len(), "Firecrawl search complete");
            return Ok(body);
        }
    }
}

/// Trim whitespace and surrounding quotes. Models like to quote their queries.
fn clean_query(query: &str) -> Result<&str> {
    let cleaned = query.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        return Err(FirecrawlError::EmptyQuery);
    }
    Ok(cleaned)
}

fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_query_strips_quotes() {
        assert_eq!(clean_query("  \"rust tokio\" ").unwrap(), "rust tokio");
        assert_eq!(clean_query("plain").unwrap(), "plain");
    }

    #[test]
    fn test_clean_query_rejects_empty() {
        assert!(matches!(clean_query("  \"\"  "), Err(FirecrawlError::EmptyQuery)));
    }

    #[test]
    fn test_retry_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(3));
        assert_eq!(policy.delay(1), Duration::from_secs(10));
        assert_eq!(policy.delay(2), Duration::from_secs(10));
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = FirecrawlClient::new("fc-test").with_base_url("http://localhost:3002/v1/");
        assert_eq!(client.base_url(), "http://localhost:3002/v1");
    }

    #[tokio::test]
    async fn test_search_rejects_blank_query_without_network() {
        let client = FirecrawlClient::new("fc-test").with_base_url("http://127.0.0.1:9");
        let err = client.search("   ", &SearchOptions::default()).await.unwrap_err();
        assert!(matches!(err, FirecrawlError::EmptyQuery));
    }
}
