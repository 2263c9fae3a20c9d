use std::collections::HashSet;
use std::sync::Arc;

use ai_client::{generate, StructuredGenerator};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::error::{ResearchError, Result};
use crate::prompt::system_prompt;
use crate::types::QueryPlan;

/// Model output for query planning.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SerpQueries {
    /// List of SERP queries, max of the requested count.
    pub queries: Vec<QueryPlan>,
}

/// Expands a topic into search queries, each with a research goal.
pub struct QueryPlanner {
    generator: Arc<dyn StructuredGenerator>,
}

impl QueryPlanner {
    pub fn new(generator: Arc<dyn StructuredGenerator>) -> Self {
        Self { generator }
    }

    /// At most `max_queries` plans with pairwise distinct query text.
    /// `max_queries == 0` returns nothing without calling the model.
    pub async fn plan(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> Result<Vec<QueryPlan>> {
        if max_queries == 0 {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(topic, prior_learnings, max_queries);
        let response: SerpQueries = generate(self.generator.as_ref(), &system_prompt(), &prompt)
            .await
            .map_err(ResearchError::Planning)?;

        let plans = distinct_plans(response.queries, max_queries);
        info!(
            count = plans.len(),
            queries = ?plans.iter().map(|p| p.query.as_str()).collect::<Vec<_>>(),
            "Created search queries"
        );
        Ok(plans)
    }
}

fn build_prompt(topic: &str, prior_learnings: &[String], max_queries: usize) -> String {
    let mut prompt = format!(
        "Given the following prompt from the user, generate a list of SERP queries to research the topic. \
         Return a maximum of {max_queries} queries, but feel free to return less if the original prompt is clear. \
         Make sure each query is unique and not similar to each other: <prompt>{topic}</prompt>\n\n"
    );
    if !prior_learnings.is_empty() {
        prompt.push_str(
            "Here are some learnings from previous research, use them to generate more specific queries: ",
        );
        prompt.push_str(&prior_learnings.join("\n"));
    }
    prompt
}

/// Drops blank and repeated queries, then caps the count.
fn distinct_plans(plans: Vec<QueryPlan>, max_queries: usize) -> Vec<QueryPlan> {
    let mut seen = HashSet::new();
    plans
        .into_iter()
        .filter(|p| !p.query.trim().is_empty())
        .filter(|p| seen.insert(p.query.clone()))
        .take(max_queries)
        .collect()
}
