use ai_client::{generate, StructuredGenerator};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ResearchError, Result};
use crate::prompt::system_prompt;

pub const DEFAULT_MAX_QUESTIONS: usize = 3;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FeedbackQuestions {
    /// Follow up questions to clarify the research direction, max of the requested count.
    pub questions: Vec<String>,
}

/// Asks the model for up to `max_questions` questions that would sharpen `query`.
pub async fn generate_feedback(
    generator: &dyn StructuredGenerator,
    query: &str,
    max_questions: usize,
) -> Result<Vec<String>> {
    if max_questions == 0 {
        return Ok(Vec::new());
    }
    let prompt = format!(
        "Given the following query from the user, ask some follow up questions to clarify the research direction. \
         Return a maximum of {max_questions} questions, but feel free to return less if the original query is clear: \
         <query>{query}</query>"
    );
    let response: FeedbackQuestions = generate(generator, &system_prompt(), &prompt)
        .await
        .map_err(ResearchError::Feedback)?;

    let questions: Vec<String> = response
        .questions
        .into_iter()
        .filter(|q| !q.trim().is_empty())
        .take(max_questions)
        .collect();
    debug!(count = questions.len(), "Generated follow-up questions");
    Ok(questions)
}

/// Folds the user's answers into the query that seeds research.
pub fn combine_query(initial: &str, answers: &[(String, String)]) -> String {
    let qa = answers
        .iter()
        .map(|(q, a)| format!("Q: {q}\nA: {a}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Initial Query: {initial}\nFollow-up Questions and Answers:\n{qa}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_query() {
        let combined = combine_query(
            "EV adoption in Norway",
            &[
                ("Which years?".to_string(), "2015 to 2024".to_string()),
                ("Include hybrids?".to_string(), "No".to_string()),
            ],
        );
        assert_eq!(
            combined,
            "Initial Query: EV adoption in Norway\nFollow-up Questions and Answers:\n\
             Q: Which years?\nA: 2015 to 2024\nQ: Include hybrids?\nA: No"
        );
    }
}
