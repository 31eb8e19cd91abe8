mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use anyhow::{anyhow, Result};

use client::Transport;
use types::{ChatRequest, JsonSchemaFormat, ResponseFormat, StructuredRequest, WireMessage};

/// OpenAI chat agent bound to a single model.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    temperature: f32,
    base_url: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(api_key) => Ok(Self::new(api_key, model)),
            Err(_) => Err(anyhow!("OPENAI_API_KEY environment variable not set")),
        }
    }

    /// Sampling temperature for chat completions. Structured output always
    /// runs at 0.0.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    fn transport(&self) -> Transport {
        Transport::new(&self.api_key, self.base_url.as_deref())
    }

    /// Plain chat completion at the configured temperature.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .max_tokens(4096)
            .temperature(self.temperature);

        self.transport().complete(&self.model, &request).await
    }

    /// Strict structured output against `schema`. Returns the raw JSON
    /// string so callers decide how to treat unparsable model output.
    pub async fn structured_output(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = StructuredRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: Some(0.0),
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema_name.to_string(),
                    strict: true,
                    schema,
                },
            },
        };

        self.transport().complete(&self.model, &request).await
    }
}
