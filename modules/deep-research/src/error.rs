use ai_client::AiError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResearchError>;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Planning error: {0}")]
    Planning(#[source] AiError),

    #[error("Search error for {query:?}: {message}")]
    Search { query: String, message: String },

    #[error("Search timed out for {query:?}")]
    SearchTimeout { query: String },

    #[error("Distillation error: {0}")]
    Distillation(#[source] AiError),

    #[error("Report synthesis error: {0}")]
    Synthesis(#[source] AiError),

    #[error("Feedback error: {0}")]
    Feedback(#[source] AiError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller aborted the session. Never produced by a branch failure.
    #[error("Research cancelled")]
    Cancelled,
}

impl ResearchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResearchError::SearchTimeout { .. })
    }
}
