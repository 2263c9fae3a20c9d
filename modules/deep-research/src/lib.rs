pub mod config;
pub mod distiller;
pub mod error;
pub mod feedback;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod text_splitter;
pub mod traits;
pub mod trim;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{Config, Provider, ResearchOptions};
pub use distiller::ResultDistiller;
pub use error::{ResearchError, Result};
pub use feedback::{combine_query, generate_feedback};
pub use orchestrator::ResearchOrchestrator;
pub use planner::QueryPlanner;
pub use progress::{ProgressSink, ProgressTracker, ProgressUpdate, ResearchProgress};
pub use report::ReportSynthesizer;
pub use text_splitter::RecursiveCharacterTextSplitter;
pub use traits::WebSearch;
pub use trim::trim_prompt;
pub use types::{
    DistillResult, FinalReport, HitMetadata, QueryPlan, ResearchResult, SearchHit, SearchPage,
    VisitedSet,
};
