//! Row types for the post store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as stored in Postgres. Real posts arrive from operators or an
/// upstream feed; synthetic posts carry provenance back to their seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub is_synthetic: bool,
    pub persona: Option<String>,
    pub lang: Option<String>,
    pub seed_post_id: Option<i64>,
    pub hashtags: Option<String>,
}

/// A post to be inserted. The store assigns id and created_at; `processed`
/// always starts false.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub is_synthetic: bool,
    pub persona: Option<String>,
    pub lang: Option<String>,
    pub seed_post_id: Option<i64>,
    pub hashtags: Option<String>,
}

impl NewPost {
    /// A real (non-synthetic) post.
    pub fn real(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_synthetic: false,
            persona: None,
            lang: None,
            seed_post_id: None,
            hashtags: None,
        }
    }

    /// A synthetic post derived from the seed with the given id.
    pub fn synthetic(text: impl Into<String>, seed_post_id: i64) -> Self {
        Self {
            text: text.into(),
            is_synthetic: true,
            persona: None,
            lang: None,
            seed_post_id: Some(seed_post_id),
            hashtags: None,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_hashtags(mut self, hashtags: impl Into<String>) -> Self {
        self.hashtags = Some(hashtags.into());
        self
    }
}

/// A confirmed incident as stored in Postgres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmedIncident {
    pub id: i64,
    pub source_post_id: i64,
    pub incident_type: Option<String>,
    pub summary: Option<String>,
    pub confidence: i32,
    pub location_country: Option<String>,
    pub location_area: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An incident to be inserted once the classifier confirms a post.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub source_post_id: i64,
    pub incident_type: Option<String>,
    pub summary: Option<String>,
    pub confidence: i32,
    pub location_country: Option<String>,
    pub location_area: Option<String>,
}
