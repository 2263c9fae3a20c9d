use std::sync::Arc;

use ai_client::{generate, StructuredGenerator};
use tracing::info;

use crate::error::{ResearchError, Result};
use crate::prompt::system_prompt;
use crate::trim::trim_prompt;
use crate::types::{DistillResult, SearchHit};

/// Default per-document token budget.
pub const DEFAULT_CONTENT_BUDGET: usize = 25_000;

/// Turns the hits for one query into learnings and follow-up directions.
pub struct ResultDistiller {
    generator: Arc<dyn StructuredGenerator>,
    content_budget: usize,
}

impl ResultDistiller {
    pub fn new(generator: Arc<dyn StructuredGenerator>) -> Self {
        Self {
            generator,
            content_budget: DEFAULT_CONTENT_BUDGET,
        }
    }

    pub fn with_content_budget(mut self, budget: usize) -> Self {
        self.content_budget = budget;
        self
    }

    /// Hits without a body are skipped. The model is called even when no
    /// hit has content.
    pub async fn distill(
        &self,
        query: &str,
        hits: &[SearchHit],
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> Result<DistillResult> {
        let contents: Vec<String> = hits
            .iter()
            .filter_map(SearchHit::content)
            .map(|c| trim_prompt(c, self.content_budget))
            .collect();
        info!(query, contents = contents.len(), "Ran query");

        let prompt = build_prompt(query, &contents, max_learnings);
        let mut result: DistillResult =
            generate(self.generator.as_ref(), &system_prompt(), &prompt)
                .await
                .map_err(ResearchError::Distillation)?;

        result.learnings.retain(|l| !l.trim().is_empty());
        result.learnings.truncate(max_learnings);
        result.follow_up_questions.retain(|q| !q.trim().is_empty());
        result.follow_up_questions.truncate(max_follow_ups);

        info!(query, count = result.learnings.len(), "Created learnings");
        Ok(result)
    }
}

fn build_prompt(query: &str, contents: &[String], max_learnings: usize) -> String {
    let wrapped = contents
        .iter()
        .map(|c| format!("<content>\n{c}\n</content>"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Given the following contents from a SERP search for the query <query>{query}</query>, generate a list of learnings from the contents. \
         Return a maximum of {max_learnings} learnings, but feel free to return less if the contents are clear. \
         Ensure each learning is unique and information-dense; include entities like people, places, companies, products, metrics, numbers, or dates. \
         These learnings will be used to guide further research.\n\n<contents>{wrapped}</contents>"
    )
}
