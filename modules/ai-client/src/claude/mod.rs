mod client;
pub(crate) mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::schema::SchemaDescriptor;
use crate::traits::StructuredGenerator;
use crate::util::extract_json_object;

use client::ClaudeClient;
use types::*;

const STRUCTURED_TOOL_NAME: &str = "structured_response";

// =============================================================================
// Claude
// =============================================================================

/// Anthropic Messages API. Structured output is obtained by forcing a single
/// tool call whose input schema is the requested contract.
#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    max_tokens: u32,
    temperature: f32,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            max_tokens: 8192,
            temperature: 0.3,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key, self.http.clone());
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    fn request(&self, system: &str, user: &str, schema: &SchemaDescriptor) -> ChatRequest {
        ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(user))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL_NAME.to_string(),
                description: format!("Respond with a {} object.", schema.name),
                input_schema: schema.schema.clone(),
            })
            .force_tool(STRUCTURED_TOOL_NAME)
    }
}

#[async_trait]
impl StructuredGenerator for Claude {
    async fn generate_value(
        &self,
        system: &str,
        user: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value> {
        let request = self.request(system, user, schema);
        let response = self.client().chat(&request).await?;

        if let Some(input) = response.tool_input(STRUCTURED_TOOL_NAME) {
            return Ok(input.clone());
        }

        // Some proxies drop tool use and answer in plain text.
        match response.text() {
            Some(text) => serde_json::from_str(extract_json_object(text))
                .map_err(|e| AiError::Parse(format!("{e}; response text: {text}"))),
            None => Err(AiError::EmptyResponse("Claude".to_string())),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
