use std::sync::Arc;

use ai_client::{generate, StructuredGenerator};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::error::{ResearchError, Result};
use crate::prompt::system_prompt;
use crate::trim::trim_prompt;
use crate::types::{FinalReport, ResearchResult};

/// Default token budget for the joined learnings block.
pub const DEFAULT_REPORT_BUDGET: usize = 150_000;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    /// Final report on the topic in Markdown
    pub report_markdown: String,
}

/// Writes the final report from everything a session learned.
pub struct ReportSynthesizer {
    generator: Arc<dyn StructuredGenerator>,
    learnings_budget: usize,
}

impl ReportSynthesizer {
    pub fn new(generator: Arc<dyn StructuredGenerator>) -> Self {
        Self {
            generator,
            learnings_budget: DEFAULT_REPORT_BUDGET,
        }
    }

    pub fn with_learnings_budget(mut self, budget: usize) -> Self {
        self.learnings_budget = budget;
        self
    }

    /// The Sources section lists `visited_urls` in the order given and is
    /// left out entirely when there are none.
    pub async fn synthesize(
        &self,
        original_prompt: &str,
        learnings: &[String],
        visited_urls: &[String],
    ) -> Result<FinalReport> {
        let wrapped = learnings
            .iter()
            .map(|l| format!("<learning>\n{l}\n</learning>"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = trim_prompt(&wrapped, self.learnings_budget);

        let prompt = format!(
            "Given the following prompt from the user, write a final report on the topic using the learnings from research. \
             Make it as detailed as possible, aim for 3 or more pages, include ALL the learnings from research:\n\n\
             <prompt>{original_prompt}</prompt>\n\n\
             Here are all the learnings from previous research:\n\n\
             <learnings>\n{trimmed}\n</learnings>"
        );

        let draft: ReportDraft = generate(self.generator.as_ref(), &system_prompt(), &prompt)
            .await
            .map_err(ResearchError::Synthesis)?;
        info!(
            learnings = learnings.len(),
            sources = visited_urls.len(),
            "Report written"
        );

        let mut markdown = draft.report_markdown;
        markdown.push_str(&render_sources(visited_urls));
        Ok(FinalReport { markdown })
    }

    pub async fn synthesize_result(
        &self,
        original_prompt: &str,
        result: &ResearchResult,
    ) -> Result<FinalReport> {
        self.synthesize(original_prompt, result.learnings(), &result.visited_urls())
            .await
    }
}

/// `\n\n## Sources\n\n- url` lines, or nothing for an empty list.
pub fn render_sources(urls: &[String]) -> String {
    if urls.is_empty() {
        return String::new();
    }
    let bullets = urls
        .iter()
        .map(|u| format!("- {u}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n## Sources\n\n{bullets}")
}
