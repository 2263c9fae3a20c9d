use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// Snapshot of where a research session is.
///
/// One record is shared by every branch of a call tree. Branches overwrite
/// fields as they go, so the snapshot shows whichever branch reported last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchProgress {
    pub current_depth: usize,
    pub total_depth: usize,
    pub current_breadth: usize,
    pub total_breadth: usize,
    pub total_queries: usize,
    pub completed_queries: usize,
    pub current_query: Option<String>,
}

/// Caller-supplied observer, invoked after every update.
pub type ProgressSink = Arc<dyn Fn(&ResearchProgress) + Send + Sync>;

/// Partial update. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    current_depth: Option<usize>,
    current_breadth: Option<usize>,
    total_queries: Option<usize>,
    complete_query: bool,
    current_query: Option<Option<String>>,
}

impl ProgressUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_depth(mut self, depth: usize) -> Self {
        self.current_depth = Some(depth);
        self
    }

    pub fn current_breadth(mut self, breadth: usize) -> Self {
        self.current_breadth = Some(breadth);
        self
    }

    pub fn total_queries(mut self, total: usize) -> Self {
        self.total_queries = Some(total);
        self
    }

    /// Bumps `completedQueries` by one.
    pub fn complete_query(mut self) -> Self {
        self.complete_query = true;
        self
    }

    pub fn current_query(mut self, query: Option<String>) -> Self {
        self.current_query = Some(query);
        self
    }

    fn apply(self, progress: &mut ResearchProgress) {
        if let Some(depth) = self.current_depth {
            progress.current_depth = depth;
        }
        if let Some(breadth) = self.current_breadth {
            progress.current_breadth = breadth;
        }
        if let Some(total) = self.total_queries {
            progress.total_queries = total;
        }
        if self.complete_query {
            progress.completed_queries += 1;
        }
        if let Some(query) = self.current_query {
            progress.current_query = query;
        }
    }
}

pub struct ProgressTracker {
    state: Mutex<ResearchProgress>,
    sink: Option<ProgressSink>,
}

impl ProgressTracker {
    pub fn new(depth: usize, breadth: usize, sink: Option<ProgressSink>) -> Self {
        Self {
            state: Mutex::new(ResearchProgress {
                current_depth: depth,
                total_depth: depth,
                current_breadth: breadth,
                total_breadth: breadth,
                ..Default::default()
            }),
            sink,
        }
    }

    /// Applies `update` to the shared record and hands the result to the sink.
    pub fn report(&self, update: ProgressUpdate) {
        let snapshot = {
            let mut state = self.lock();
            update.apply(&mut state);
            state.clone()
        };
        if let Some(sink) = &self.sink {
            sink(&snapshot);
        }
    }

    pub fn snapshot(&self) -> ResearchProgress {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ResearchProgress> {
        // The record is advisory; a panicked writer leaves it usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_totals() {
        let tracker = ProgressTracker::new(3, 4, None);
        let progress = tracker.snapshot();
        assert_eq!(progress.total_depth, 3);
        assert_eq!(progress.current_depth, 3);
        assert_eq!(progress.total_breadth, 4);
        assert_eq!(progress.completed_queries, 0);
        assert_eq!(progress.current_query, None);
    }

    #[test]
    fn test_report_overwrites_only_named_fields() {
        let tracker = ProgressTracker::new(2, 4, None);
        tracker.report(
            ProgressUpdate::new()
                .total_queries(4)
                .current_query(Some("solar".into())),
        );
        tracker.report(ProgressUpdate::new().current_depth(1).complete_query());

        let progress = tracker.snapshot();
        assert_eq!(progress.total_queries, 4);
        assert_eq!(progress.current_depth, 1);
        assert_eq!(progress.current_breadth, 4);
        assert_eq!(progress.completed_queries, 1);
        assert_eq!(progress.current_query.as_deref(), Some("solar"));

        tracker.report(ProgressUpdate::new().current_query(None));
        assert_eq!(tracker.snapshot().current_query, None);
    }

    #[test]
    fn test_sink_sees_every_update() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let sink: ProgressSink = Arc::new(move |p: &ResearchProgress| {
            sink_seen.lock().unwrap().push(p.completed_queries);
        });
        let tracker = ProgressTracker::new(1, 2, Some(sink));
        tracker.report(ProgressUpdate::new().complete_query());
        tracker.report(ProgressUpdate::new().complete_query());
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
