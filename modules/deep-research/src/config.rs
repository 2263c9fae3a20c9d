use std::env;
use std::sync::Arc;
use std::time::Duration;

use ai_client::{Claude, OpenAi, StructuredGenerator};
use firecrawl_client::FirecrawlClient;
use tracing::info;
use typed_builder::TypedBuilder;

use crate::distiller::DEFAULT_CONTENT_BUDGET;
use crate::error::{ResearchError, Result};
use crate::report::DEFAULT_REPORT_BUDGET;
use crate::trim::DEFAULT_CONTEXT_SIZE;

pub const DEFAULT_MODEL: &str = "o3-mini";
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_FIRECRAWL_URL: &str = "https://api.firecrawl.dev/v1";
pub const DEFAULT_CONCURRENCY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            Provider::Anthropic
        } else {
            Provider::OpenAi
        }
    }
}

/// Environment-driven settings for the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_endpoint: String,
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub provider: Provider,
    pub context_size: usize,
    pub firecrawl_api_key: String,
    pub firecrawl_base_url: String,
    pub concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = get("RESEARCH_MODEL")
            .or_else(|| get("OPENAI_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let provider = Provider::for_model(&model);
        let openai_api_key = get("OPENAI_API_KEY");
        let anthropic_api_key = get("ANTHROPIC_API_KEY");

        match provider {
            Provider::OpenAi if openai_api_key.is_none() => {
                return Err(ResearchError::Config(format!(
                    "OPENAI_API_KEY is required for model {model}"
                )))
            }
            Provider::Anthropic if anthropic_api_key.is_none() => {
                return Err(ResearchError::Config(format!(
                    "ANTHROPIC_API_KEY is required for model {model}"
                )))
            }
            _ => {}
        }

        let firecrawl_api_key = get("FIRECRAWL_API_KEY").ok_or_else(|| {
            ResearchError::Config("FIRECRAWL_API_KEY environment variable is required".into())
        })?;

        Ok(Self {
            openai_api_key,
            openai_endpoint: get("OPENAI_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            anthropic_api_key,
            model,
            provider,
            context_size: parse_or(get("CONTEXT_SIZE"), "CONTEXT_SIZE", DEFAULT_CONTEXT_SIZE)?,
            firecrawl_api_key,
            firecrawl_base_url: get("FIRECRAWL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRECRAWL_URL.to_string()),
            concurrency: parse_or(
                get("RESEARCH_CONCURRENCY"),
                "RESEARCH_CONCURRENCY",
                DEFAULT_CONCURRENCY,
            )?,
        })
    }

    /// Log the effective config with secrets redacted.
    pub fn log_redacted(&self) {
        fn redact(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "[set]"
            } else {
                "[missing]"
            }
        }
        info!(
            model = %self.model,
            provider = ?self.provider,
            openai_endpoint = %self.openai_endpoint,
            openai_api_key = redact(&self.openai_api_key),
            anthropic_api_key = redact(&self.anthropic_api_key),
            firecrawl_api_key = "[set]",
            firecrawl_base_url = %self.firecrawl_base_url,
            context_size = self.context_size,
            concurrency = self.concurrency,
            "Config loaded"
        );
    }

    pub fn generator(&self) -> Result<Arc<dyn StructuredGenerator>> {
        let missing = |name: &str| ResearchError::Config(format!("{name} is not set"));
        let generator: Arc<dyn StructuredGenerator> = match self.provider {
            Provider::OpenAi => {
                let key = self.openai_api_key.as_deref().ok_or_else(|| missing("OPENAI_API_KEY"))?;
                Arc::new(OpenAi::new(key, &self.model).with_base_url(&self.openai_endpoint))
            }
            Provider::Anthropic => {
                let key = self
                    .anthropic_api_key
                    .as_deref()
                    .ok_or_else(|| missing("ANTHROPIC_API_KEY"))?;
                Arc::new(Claude::new(key, &self.model))
            }
        };
        Ok(generator)
    }

    pub fn searcher(&self) -> FirecrawlClient {
        FirecrawlClient::new(&self.firecrawl_api_key).with_base_url(&self.firecrawl_base_url)
    }

    pub fn research_options(&self) -> ResearchOptions {
        ResearchOptions::builder()
            .concurrency(self.concurrency)
            .content_budget(self.context_size.min(DEFAULT_CONTENT_BUDGET))
            .report_budget(self.context_size.min(DEFAULT_REPORT_BUDGET))
            .build()
    }
}

fn parse_or(value: Option<String>, key: &str, default: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ResearchError::Config(format!("{key} must be a number, got {v:?}"))),
    }
}

/// Per-run knobs for [`crate::ResearchOrchestrator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResearchOptions {
    /// Simultaneous search+distill steps across the whole call tree.
    #[builder(default = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    #[builder(default = 5)]
    pub search_limit: u32,
    /// Server-side timeout handed to the search backend.
    #[builder(default = Duration::from_secs(15))]
    pub search_timeout: Duration,
    /// Extra time a search may take past `search_timeout`, retries included,
    /// before the branch gives up on it.
    #[builder(default = Duration::from_secs(5))]
    pub search_grace: Duration,
    #[builder(default = DEFAULT_CONTENT_BUDGET)]
    pub content_budget: usize,
    #[builder(default = DEFAULT_REPORT_BUDGET)]
    pub report_budget: usize,
}

impl ResearchOptions {
    /// Hard bound on one search call as seen by the orchestrator.
    pub fn search_deadline(&self) -> Duration {
        self.search_timeout + self.search_grace
    }
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
