//! Recursive research scheduler.
//!
//! Each node plans up to `breadth` queries and runs them as branches. A
//! branch searches, distills, then either recurses with half the breadth
//! and one less depth or returns what it has accumulated. Branches are
//! isolated: any failure other than cancellation turns into "no new
//! information" and the branch hands back exactly the state it was given.
//!
//! Every search is bounded by the configured deadline whether or not the
//! backend honours its own timeout.
//!
//! All branches in one call tree share a single semaphore. A permit covers
//! the search and distill calls of one branch and is released before that
//! branch recurses, so children never wait on a permit their parent holds.

use std::sync::Arc;

use ai_client::StructuredGenerator;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ResearchOptions;
use crate::distiller::ResultDistiller;
use crate::error::{ResearchError, Result};
use crate::planner::QueryPlanner;
use crate::progress::{ProgressSink, ProgressTracker, ProgressUpdate};
use crate::traits::WebSearch;
use crate::types::{QueryPlan, ResearchResult, SearchHit};

/// State shared by every node of one top-level call.
struct Session {
    permits: Semaphore,
    progress: ProgressTracker,
    cancel: CancellationToken,
}

pub struct ResearchOrchestrator {
    planner: QueryPlanner,
    distiller: ResultDistiller,
    searcher: Arc<dyn WebSearch>,
    options: ResearchOptions,
}

impl ResearchOrchestrator {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        searcher: Arc<dyn WebSearch>,
        options: ResearchOptions,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(generator.clone()),
            distiller: ResultDistiller::new(generator).with_content_budget(options.content_budget),
            searcher,
            options,
        }
    }

    pub fn options(&self) -> &ResearchOptions {
        &self.options
    }

    /// Run a full research session from scratch.
    pub async fn research(
        &self,
        query: &str,
        breadth: usize,
        depth: usize,
        on_progress: Option<ProgressSink>,
    ) -> Result<ResearchResult> {
        self.research_from(
            query,
            breadth,
            depth,
            ResearchResult::new(),
            on_progress,
            CancellationToken::new(),
        )
        .await
    }

    /// Run a session seeded with prior learnings and visited hits.
    ///
    /// Cancelling `cancel` aborts every pending branch and returns
    /// [`ResearchError::Cancelled`]. Only a failure of the top-level
    /// planning step is returned as an error otherwise.
    pub async fn research_from(
        &self,
        query: &str,
        breadth: usize,
        depth: usize,
        prior: ResearchResult,
        on_progress: Option<ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<ResearchResult> {
        if cancel.is_cancelled() {
            return Err(ResearchError::Cancelled);
        }

        let session = Session {
            permits: Semaphore::new(self.options.concurrency.max(1)),
            progress: ProgressTracker::new(depth, breadth, on_progress),
            cancel: cancel.clone(),
        };

        info!(query, breadth, depth, "Starting research");
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResearchError::Cancelled),
            result = self.research_node(&session, query.to_string(), breadth, depth, prior) => result,
        }?;

        info!(
            learnings = result.learnings().len(),
            visited = result.visited().len(),
            "Research complete"
        );
        Ok(result)
    }

    fn research_node<'a>(
        &'a self,
        session: &'a Session,
        query: String,
        breadth: usize,
        depth: usize,
        prior: ResearchResult,
    ) -> BoxFuture<'a, Result<ResearchResult>> {
        async move {
            if session.cancel.is_cancelled() {
                return Err(ResearchError::Cancelled);
            }

            let plans = self.planner.plan(&query, prior.learnings(), breadth).await?;
            session.progress.report(
                ProgressUpdate::new()
                    .total_queries(plans.len())
                    .current_query(plans.first().map(|p| p.query.clone())),
            );

            let prior_ref = &prior;
            let branches = plans
                .into_iter()
                .map(move |plan| self.run_branch(session, plan, breadth, depth, prior_ref));
            let outcomes = join_all(branches).await;

            let mut merged = prior.clone();
            for outcome in outcomes {
                merged.merge(outcome?);
            }
            Ok(merged)
        }
        .boxed()
    }

    /// Runs one plan. Returns `Err` only on cancellation.
    async fn run_branch(
        &self,
        session: &Session,
        plan: QueryPlan,
        breadth: usize,
        depth: usize,
        prior: &ResearchResult,
    ) -> Result<ResearchResult> {
        match self.explore(session, &plan, breadth, depth, prior).await {
            Ok(result) => Ok(result),
            Err(ResearchError::Cancelled) => Err(ResearchError::Cancelled),
            Err(e) if e.is_timeout() => {
                warn!(query = %plan.query, error = %e, "Timeout running query");
                Ok(prior.clone())
            }
            Err(e) => {
                warn!(query = %plan.query, error = %e, "Error running query");
                Ok(prior.clone())
            }
        }
    }

    async fn explore(
        &self,
        session: &Session,
        plan: &QueryPlan,
        breadth: usize,
        depth: usize,
        prior: &ResearchResult,
    ) -> Result<ResearchResult> {
        let permit = session
            .permits
            .acquire()
            .await
            .map_err(|_| ResearchError::Cancelled)?;

        let search = self.searcher.search(
            &plan.query,
            self.options.search_limit,
            self.options.search_timeout,
        );
        let page = tokio::time::timeout(self.options.search_deadline(), search)
            .await
            .map_err(|_| ResearchError::SearchTimeout {
                query: plan.query.clone(),
            })??;
        if page.data.is_empty() {
            debug!(query = %plan.query, "No results");
            return Ok(prior.clone());
        }

        let next_breadth = breadth / 2;
        let distilled = self
            .distiller
            .distill(&plan.query, &page.data, next_breadth, next_breadth)
            .await?;
        drop(permit);

        let new_hits: Vec<SearchHit> = page
            .data
            .into_iter()
            .filter(|hit| hit.resolved_url().is_some())
            .collect();
        let mut accumulated = prior.clone();
        accumulated.extend_learnings(distilled.learnings);
        accumulated.extend_visited(new_hits);

        let next_depth = depth.saturating_sub(1);
        if next_depth > 0 {
            session.progress.report(
                ProgressUpdate::new()
                    .current_depth(next_depth)
                    .current_breadth(next_breadth)
                    .complete_query()
                    .current_query(Some(plan.query.clone())),
            );
            let next_query = next_query(&plan.research_goal, &distilled.follow_up_questions);
            info!(
                query = %plan.query,
                depth = next_depth,
                breadth = next_breadth,
                "Researching deeper"
            );
            self.research_node(session, next_query, next_breadth, next_depth, accumulated)
                .await
        } else {
            session.progress.report(
                ProgressUpdate::new()
                    .current_depth(0)
                    .complete_query()
                    .current_query(Some(plan.query.clone())),
            );
            Ok(accumulated)
        }
    }
}

/// Seed for the next level: the plan's goal plus the follow-up directions.
pub fn next_query(research_goal: &str, follow_ups: &[String]) -> String {
    format!(
        "Previous research goal: {research_goal}\nFollow-up research directions: {}",
        follow_ups.join("\n")
    )
    .trim()
    .to_string()
}
