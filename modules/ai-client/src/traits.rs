use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::schema::{validate, SchemaDescriptor, StructuredOutput};

// =============================================================================
// StructuredGenerator Trait
// =============================================================================

/// Prompt in, JSON object out.
///
/// Implementations return the model's object without checking it against the
/// schema; validation happens in [`generate`] so every provider shares it.
/// There is no retry at this boundary.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate_value(
        &self,
        system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value>;

    /// Model name, for logging.
    fn model(&self) -> &str;
}

/// Type-safe structured output: build the schema for `T`, call the model,
/// validate the answer.
pub async fn generate<T, G>(generator: &G, system: &str, user: &str) -> Result<T>
where
    T: StructuredOutput,
    G: StructuredGenerator + ?Sized,
{
    let descriptor = T::descriptor();
    let value = generator.generate_value(system, user, &descriptor).await?;
    validate(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use schemars::JsonSchema;
    use serde::Deserialize;

    struct Canned(Value);

    #[async_trait]
    impl StructuredGenerator for Canned {
        async fn generate_value(
            &self,
            _system: &str,
            _user: &str,
            _schema: &SchemaDescriptor,
        ) -> Result<Value> {
            Ok(self.0.clone())
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Questions {
        questions: Vec<String>,
    }

    #[tokio::test]
    async fn test_generate_validates_output() {
        let generator = Canned(serde_json::json!({ "questions": ["a", "b"] }));
        let out: Questions = generate(&generator, "sys", "user").await.unwrap();
        assert_eq!(out.questions, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_generate_rejects_mismatched_output() {
        let generator = Canned(serde_json::json!({ "answers": [] }));
        let err = generate::<Questions, _>(&generator, "sys", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Schema { .. }));
    }

    #[tokio::test]
    async fn test_generate_through_trait_object() {
        let generator: Box<dyn StructuredGenerator> =
            Box::new(Canned(serde_json::json!({ "questions": [] })));
        let out: Questions = generate(generator.as_ref(), "sys", "user").await.unwrap();
        assert!(out.questions.is_empty());
    }
}
