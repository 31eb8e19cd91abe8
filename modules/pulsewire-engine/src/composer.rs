//! Synthetic post composition.

use ai_client::OpenAi;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::prompt;

pub const COMPOSER_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature for post composition. Posts should vary between
/// emissions even for the same seed and persona.
const COMPOSER_TEMPERATURE: f32 = 0.7;

/// Writes one synthetic post from a seed report.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        seed_text: &str,
        persona: &str,
        style: &str,
        lang: &str,
    ) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI-backed composer
// ---------------------------------------------------------------------------

pub struct Composer {
    ai: OpenAi,
}

impl Composer {
    pub fn new(api_key: &str) -> Self {
        Self::with_model(api_key, COMPOSER_MODEL)
    }

    pub fn with_model(api_key: &str, model: &str) -> Self {
        Self {
            ai: OpenAi::new(api_key, model).with_temperature(COMPOSER_TEMPERATURE),
        }
    }
}

#[async_trait]
impl TextGenerator for Composer {
    async fn generate(
        &self,
        seed_text: &str,
        persona: &str,
        style: &str,
        lang: &str,
    ) -> Result<String> {
        debug!(persona, lang, "Composing synthetic post");

        let text = self
            .ai
            .chat_completion(
                prompt::composer_system(),
                prompt::composer_user(seed_text, persona, style, lang),
            )
            .await?;

        Ok(text.trim().to_string())
    }
}
