//! In-memory collaborators for tests.
//!
//! `MockGenerator` answers structured-generation calls from canned rules
//! keyed on the schema and a prompt fragment. `MockSearcher` answers
//! searches from a per-query table and records peak concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{AiError, SchemaDescriptor, StructuredGenerator, StructuredOutput};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ResearchError, Result};
use crate::feedback::FeedbackQuestions;
use crate::planner::SerpQueries;
use crate::report::ReportDraft;
use crate::traits::WebSearch;
use crate::types::{DistillResult, SearchHit, SearchPage};

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    schema: String,
    needle: String,
    reply: Reply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorCall {
    pub schema: String,
    pub prompt: String,
}

/// Rules are checked in insertion order; the first whose schema matches and
/// whose needle occurs in the user prompt wins. No match is an error.
#[derive(Default)]
pub struct MockGenerator {
    rules: Vec<Rule>,
    calls: Mutex<Vec<GeneratorCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Planning for any topic starting with `topic_prefix` returns these
    /// `(query, research_goal)` pairs.
    pub fn on_plan(self, topic_prefix: &str, plans: &[(&str, &str)]) -> Self {
        let queries: Vec<Value> = plans
            .iter()
            .map(|(query, goal)| json!({ "query": query, "researchGoal": goal }))
            .collect();
        self.rule::<SerpQueries>(
            format!("<prompt>{topic_prefix}"),
            Reply::Value(json!({ "queries": queries })),
        )
    }

    pub fn fail_plan(self, topic_prefix: &str) -> Self {
        self.rule::<SerpQueries>(
            format!("<prompt>{topic_prefix}"),
            Reply::Fail("planner unavailable".into()),
        )
    }

    /// Distilling results for exactly `query` returns these learnings.
    pub fn on_distill(self, query: &str, learnings: &[&str], follow_ups: &[&str]) -> Self {
        self.rule::<DistillResult>(
            format!("<query>{query}</query>"),
            Reply::Value(json!({ "learnings": learnings, "followUpQuestions": follow_ups })),
        )
    }

    pub fn fail_distill(self, query: &str) -> Self {
        self.rule::<DistillResult>(
            format!("<query>{query}</query>"),
            Reply::Fail("distiller unavailable".into()),
        )
    }

    pub fn on_report(self, markdown: &str) -> Self {
        self.rule::<ReportDraft>(String::new(), Reply::Value(json!({ "reportMarkdown": markdown })))
    }

    pub fn on_feedback(self, questions: &[&str]) -> Self {
        self.rule::<FeedbackQuestions>(String::new(), Reply::Value(json!({ "questions": questions })))
    }

    /// Raw reply for schema `T`, e.g. to return output that fails validation.
    pub fn on_raw<T: StructuredOutput>(self, needle: &str, value: Value) -> Self {
        self.rule::<T>(needle.to_string(), Reply::Value(value))
    }

    fn rule<T: StructuredOutput>(mut self, needle: String, reply: Reply) -> Self {
        self.rules.push(Rule {
            schema: T::type_name(),
            needle,
            reply,
        });
        self
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for<T: StructuredOutput>(&self) -> Vec<GeneratorCall> {
        let schema = T::type_name();
        self.calls()
            .into_iter()
            .filter(|c| c.schema == schema)
            .collect()
    }
}

#[async_trait]
impl StructuredGenerator for MockGenerator {
    async fn generate_value(
        &self,
        _system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> ai_client::Result<Value> {
        self.calls.lock().unwrap().push(GeneratorCall {
            schema: schema.name.clone(),
            prompt: user.to_string(),
        });

        let rule = self
            .rules
            .iter()
            .find(|r| r.schema == schema.name && user.contains(&r.needle));
        match rule.map(|r| &r.reply) {
            Some(Reply::Value(value)) => Ok(value.clone()),
            Some(Reply::Fail(reason)) => Err(AiError::Api {
                status: 500,
                message: reason.clone(),
            }),
            None => Err(AiError::EmptyResponse(format!(
                "no canned {} response",
                schema.name
            ))),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SearchBehavior {
    Hits(Vec<SearchHit>),
    Fail,
    Timeout,
    Hang,
}

/// Unknown queries return an empty page.
#[derive(Default)]
pub struct MockSearcher {
    behaviors: HashMap<String, SearchBehavior>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.behaviors
            .insert(query.to_string(), SearchBehavior::Hits(hits));
        self
    }

    pub fn fail_query(mut self, query: &str) -> Self {
        self.behaviors.insert(query.to_string(), SearchBehavior::Fail);
        self
    }

    pub fn timeout_query(mut self, query: &str) -> Self {
        self.behaviors
            .insert(query.to_string(), SearchBehavior::Timeout);
        self
    }

    /// Never completes; for exercising cancellation and search deadlines.
    pub fn hang_query(mut self, query: &str) -> Self {
        self.behaviors.insert(query.to_string(), SearchBehavior::Hang);
        self
    }

    /// Every search sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WebSearch for MockSearcher {
    async fn search(&self, query: &str, _limit: u32, _timeout: Duration) -> Result<SearchPage> {
        self.queries.lock().unwrap().push(query.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.behaviors.get(query) {
            None => Ok(SearchPage::default()),
            Some(SearchBehavior::Hits(hits)) => Ok(SearchPage { data: hits.clone() }),
            Some(SearchBehavior::Fail) => Err(ResearchError::Search {
                query: query.to_string(),
                message: "HTTP 502".into(),
            }),
            Some(SearchBehavior::Timeout) => Err(ResearchError::SearchTimeout {
                query: query.to_string(),
            }),
            Some(SearchBehavior::Hang) => {
                std::future::pending::<()>().await;
                Ok(SearchPage::default())
            }
        }
    }
}
