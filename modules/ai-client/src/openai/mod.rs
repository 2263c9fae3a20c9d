mod client;
pub(crate) mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::schema::SchemaDescriptor;
use crate::traits::StructuredGenerator;
use crate::util::extract_json_object;

use client::OpenAiClient;
use types::{
    is_reasoning_model, JsonSchemaFormat, ResponseFormat, StructuredRequest, WireMessage,
};

const DEFAULT_REASONING_EFFORT: &str = "medium";

// =============================================================================
// OpenAi
// =============================================================================

/// OpenAI-compatible chat completions endpoint with `json_schema` response format.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    temperature: f32,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            temperature: 0.3,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(client::OPENAI_API_URL)
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.http.clone());
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    fn request(&self, system: &str, user: &str, schema: &SchemaDescriptor) -> StructuredRequest {
        let reasoning = is_reasoning_model(&self.model);
        StructuredRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: if reasoning { None } else { Some(self.temperature) },
            reasoning_effort: reasoning.then(|| DEFAULT_REASONING_EFFORT.to_string()),
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema.name.clone(),
                    strict: true,
                    schema: schema.schema.clone(),
                },
            },
        }
    }
}

#[async_trait]
impl StructuredGenerator for OpenAi {
    async fn generate_value(
        &self,
        system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value> {
        let request = self.request(system, user, schema);
        let content = self.client().structured_output(&request).await?;

        serde_json::from_str(extract_json_object(&content))
            .map_err(|e| AiError::Parse(format!("{e}; response text: {content}")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
