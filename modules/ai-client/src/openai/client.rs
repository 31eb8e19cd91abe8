use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::debug;

use super::types::ChatResponse;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Transport for the chat completions endpoint. Both request shapes come back
/// as a `ChatResponse`, so the transport extracts the text and the facade
/// never sees wire types.
pub(crate) struct Transport {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Transport {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or(OPENAI_API_URL).to_string(),
        }
    }

    /// POST `body` to chat completions and return the first choice's text.
    pub async fn complete<B: Serialize>(&self, model: &str, body: &B) -> Result<String> {
        debug!(model, "OpenAI chat completions request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await?;
            return Err(anyhow!("OpenAI API error ({status}): {detail}"));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no content"))
    }
}
