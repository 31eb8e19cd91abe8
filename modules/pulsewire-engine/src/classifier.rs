//! Incident classification.

use ai_client::{OpenAi, StructuredOutput};
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::warn;

use pulsewire_store::NewIncident;

use crate::prompt;

pub const CLASSIFIER_MODEL: &str = "gpt-4.1-mini";

/// Decides whether one post describes a real human-caused incident.
#[async_trait]
pub trait PostClassifier: Send + Sync {
    async fn classify(&self, post_text: &str) -> Result<Classification>;
}

// ---------------------------------------------------------------------------
// Wire schema (what the model returns)
// ---------------------------------------------------------------------------

/// Kept as "Yes"/"No" literals; the model is steadier with them than with
/// booleans.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, JsonSchema)]
enum Verdict {
    Yes,
    No,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct JudgmentLocation {
    /// Country name or code, when the post states one
    country: Option<String>,
    /// City, district, or neighborhood, when the post states one
    city_or_area: Option<String>,
}

/// One model judgment for one post.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
struct IncidentJudgment {
    /// "Yes" when the post describes a real human-caused incident
    verdict: Verdict,
    /// 0-100
    confidence: i64,
    /// e.g. "shooting", "arson", "vehicle ramming"; null unless verdict is "Yes"
    incident_type: Option<String>,
    location: Option<JudgmentLocation>,
    /// 1-2 sentence English summary; null unless verdict is "Yes"
    summary: Option<String>,
}

// ---------------------------------------------------------------------------
// Domain result
// ---------------------------------------------------------------------------

/// Classifier output in domain form. Confidence is already clamped to 0-100.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_incident: bool,
    pub confidence: u8,
    pub incident_type: Option<String>,
    pub country: Option<String>,
    pub area: Option<String>,
    pub summary: Option<String>,
}

impl Classification {
    /// The safe default: not an incident. Used when model output is unusable.
    pub fn none() -> Self {
        Self {
            is_incident: false,
            confidence: 0,
            incident_type: None,
            country: None,
            area: None,
            summary: None,
        }
    }

    /// Incident record for the post this classification came from.
    pub fn to_incident(&self, source_post_id: i64) -> NewIncident {
        NewIncident {
            source_post_id,
            incident_type: self.incident_type.clone(),
            summary: self.summary.clone(),
            confidence: i32::from(self.confidence),
            location_country: self.country.clone(),
            location_area: self.area.clone(),
        }
    }
}

impl From<IncidentJudgment> for Classification {
    fn from(judgment: IncidentJudgment) -> Self {
        let location = judgment.location.unwrap_or(JudgmentLocation {
            country: None,
            city_or_area: None,
        });
        Self {
            is_incident: judgment.verdict == Verdict::Yes,
            confidence: judgment.confidence.clamp(0, 100) as u8,
            incident_type: judgment.incident_type,
            country: location.country,
            area: location.city_or_area,
            summary: judgment.summary,
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-backed classifier
// ---------------------------------------------------------------------------

pub struct Classifier {
    ai: OpenAi,
}

impl Classifier {
    pub fn new(api_key: &str) -> Self {
        Self::with_model(api_key, CLASSIFIER_MODEL)
    }

    pub fn with_model(api_key: &str, model: &str) -> Self {
        Self {
            ai: OpenAi::new(api_key, model),
        }
    }
}

#[async_trait]
impl PostClassifier for Classifier {
    async fn classify(&self, post_text: &str) -> Result<Classification> {
        let raw = self
            .ai
            .structured_output(
                prompt::classifier_system(),
                prompt::classifier_user(post_text),
                "incident_judgment",
                IncidentJudgment::openai_schema(),
            )
            .await?;

        // Transport errors propagate; unusable model output does not.
        match serde_json::from_str::<IncidentJudgment>(&raw) {
            Ok(judgment) => Ok(judgment.into()),
            Err(e) => {
                warn!(error = %e, "Classifier returned unparsable output, treating as no incident");
                Ok(Classification::none())
            }
        }
    }
}
