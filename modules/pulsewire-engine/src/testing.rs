//! Mock collaborators for unit tests.
//!
//! Everything here is deterministic and in-memory, so worker logic tests run
//! with no network and no database.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use pulsewire_store::{ConfirmedIncident, NewIncident, NewPost, Post};

use crate::classifier::{Classification, PostClassifier};
use crate::composer::TextGenerator;
use crate::traits::PostStore;

/// A confirmed-incident classification at the given confidence.
pub fn confirmed_classification(confidence: u8) -> Classification {
    Classification {
        is_incident: true,
        confidence,
        incident_type: Some("disturbance".to_string()),
        country: None,
        area: None,
        summary: Some("Something happened.".to_string()),
    }
}

// ---------------------------------------------------------------------------
// MockPostStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    posts: Vec<Post>,
    incidents: Vec<ConfirmedIncident>,
    next_post_id: i64,
    next_incident_id: i64,
    created: usize,
    seed_lookups: usize,
    mutations: usize,
    mark_calls: HashMap<i64, usize>,
    fail_creates: bool,
    fail_fetches: bool,
    fail_marks: bool,
    fail_incidents: bool,
}

/// In-memory `PostStore` with failure injection and assertion helpers.
/// Seeded post ids are sequential from 1 in builder order.
pub struct MockPostStore {
    state: Mutex<StoreState>,
}

impl MockPostStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                next_post_id: 1,
                next_incident_id: 1,
                ..StoreState::default()
            }),
        }
    }

    fn seed_post(self, text: &str, processed: bool, seed_post_id: Option<i64>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_post_id;
            state.next_post_id += 1;
            state.posts.push(Post {
                id,
                text: text.to_string(),
                created_at: Utc::now(),
                processed,
                is_synthetic: seed_post_id.is_some(),
                persona: None,
                lang: None,
                seed_post_id,
                hashtags: None,
            });
        }
        self
    }

    /// Seed an unprocessed real post.
    pub fn with_real_post(self, text: &str) -> Self {
        self.seed_post(text, false, None)
    }

    /// Seed a real post that has already been through classification.
    pub fn with_processed_post(self, text: &str) -> Self {
        self.seed_post(text, true, None)
    }

    /// Seed an unprocessed synthetic post with provenance.
    pub fn with_unprocessed_synthetic(self, text: &str, seed_post_id: i64) -> Self {
        self.seed_post(text, false, Some(seed_post_id))
    }

    pub fn failing_creates(self) -> Self {
        self.state.lock().unwrap().fail_creates = true;
        self
    }

    pub fn failing_fetches(self) -> Self {
        self.state.lock().unwrap().fail_fetches = true;
        self
    }

    pub fn failing_marks(self) -> Self {
        self.state.lock().unwrap().fail_marks = true;
        self
    }

    pub fn failing_incidents(self) -> Self {
        self.state.lock().unwrap().fail_incidents = true;
        self
    }

    // -----------------------------------------------------------------------
    // Assertion helpers
    // -----------------------------------------------------------------------

    /// Posts created through `create_post` (seeded posts excluded).
    pub fn posts_created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn synthetic_count(&self) -> usize {
        self.synthetic_posts().len()
    }

    pub fn synthetic_posts(&self) -> Vec<Post> {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| p.is_synthetic)
            .cloned()
            .collect()
    }

    pub fn is_processed(&self, id: i64) -> bool {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .any(|p| p.id == id && p.processed)
    }

    /// How many times `mark_processed` was attempted for `id`.
    pub fn mark_count(&self, id: i64) -> usize {
        self.state
            .lock()
            .unwrap()
            .mark_calls
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn incident_count(&self) -> usize {
        self.state.lock().unwrap().incidents.len()
    }

    pub fn incidents_for(&self, post_id: i64) -> Vec<ConfirmedIncident> {
        self.state
            .lock()
            .unwrap()
            .incidents
            .iter()
            .filter(|i| i.source_post_id == post_id)
            .cloned()
            .collect()
    }

    /// Attempted writes: creates, marks, and incident inserts, failed or not.
    pub fn mutation_count(&self) -> usize {
        self.state.lock().unwrap().mutations
    }

    /// How many times `post_by_id` was called.
    pub fn seed_lookups(&self) -> usize {
        self.state.lock().unwrap().seed_lookups
    }
}

impl Default for MockPostStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostStore for MockPostStore {
    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let mut state = self.state.lock().unwrap();
        state.mutations += 1;
        if state.fail_creates {
            bail!("MockPostStore: create_post forced failure");
        }
        let id = state.next_post_id;
        state.next_post_id += 1;
        state.created += 1;
        let stored = Post {
            id,
            text: post.text.clone(),
            created_at: Utc::now(),
            processed: false,
            is_synthetic: post.is_synthetic,
            persona: post.persona.clone(),
            lang: post.lang.clone(),
            seed_post_id: post.seed_post_id,
            hashtags: post.hashtags.clone(),
        };
        state.posts.push(stored.clone());
        Ok(stored)
    }

    async fn post_by_id(&self, id: i64) -> Result<Option<Post>> {
        let mut state = self.state.lock().unwrap();
        state.seed_lookups += 1;
        if state.fail_fetches {
            bail!("MockPostStore: post_by_id forced failure");
        }
        Ok(state.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn latest_real_post(&self) -> Result<Option<Post>> {
        let state = self.state.lock().unwrap();
        if state.fail_fetches {
            bail!("MockPostStore: latest_real_post forced failure");
        }
        Ok(state.posts.iter().rev().find(|p| !p.is_synthetic).cloned())
    }

    async fn unprocessed_posts(&self, limit: i64, include_synthetic: bool) -> Result<Vec<Post>> {
        let state = self.state.lock().unwrap();
        if state.fail_fetches {
            bail!("MockPostStore: unprocessed_posts forced failure");
        }
        Ok(state
            .posts
            .iter()
            .filter(|p| !p.processed && (include_synthetic || !p.is_synthetic))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: i64) -> Result<Option<Post>> {
        let mut state = self.state.lock().unwrap();
        state.mutations += 1;
        *state.mark_calls.entry(id).or_insert(0) += 1;
        if state.fail_marks {
            bail!("MockPostStore: mark_processed forced failure");
        }
        match state.posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                post.processed = true;
                Ok(Some(post.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_incident(&self, incident: &NewIncident) -> Result<ConfirmedIncident> {
        let mut state = self.state.lock().unwrap();
        state.mutations += 1;
        if state.fail_incidents {
            bail!("MockPostStore: create_incident forced failure");
        }
        let id = state.next_incident_id;
        state.next_incident_id += 1;
        let stored = ConfirmedIncident {
            id,
            source_post_id: incident.source_post_id,
            incident_type: incident.incident_type.clone(),
            summary: incident.summary.clone(),
            confidence: incident.confidence,
            location_country: incident.location_country.clone(),
            location_area: incident.location_area.clone(),
            created_at: Utc::now(),
        };
        state.incidents.push(stored.clone());
        Ok(stored)
    }

    async fn recent_incidents(&self, limit: i64) -> Result<Vec<ConfirmedIncident>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .incidents
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockComposer
// ---------------------------------------------------------------------------

/// Deterministic `TextGenerator`. Formats a post from its inputs; can fail on
/// chosen call indices (1-based) to exercise per-emission isolation.
pub struct MockComposer {
    calls: Mutex<usize>,
    fail_on: Vec<usize>,
    fail_all: bool,
}

impl MockComposer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
            fail_on: Vec::new(),
            fail_all: false,
        }
    }

    /// Every call fails.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// The nth call (1-based) fails.
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on.push(call);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Default for MockComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockComposer {
    async fn generate(
        &self,
        seed_text: &str,
        persona: &str,
        _style: &str,
        lang: &str,
    ) -> Result<String> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if self.fail_all || self.fail_on.contains(&call) {
            bail!("MockComposer: generate forced failure on call {call}");
        }
        Ok(format!("[{persona}/{lang}] {seed_text}"))
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Scripted `PostClassifier`. Responses are keyed by exact post text; unknown
/// text classifies as the safe default.
pub struct MockClassifier {
    responses: HashMap<String, Classification>,
    failing_texts: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            failing_texts: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_text(mut self, text: &str, classification: Classification) -> Self {
        self.responses.insert(text.to_string(), classification);
        self
    }

    /// Classification of this exact text fails.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing_texts.push(text.to_string());
        self
    }

    /// Post texts classified so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostClassifier for MockClassifier {
    async fn classify(&self, post_text: &str) -> Result<Classification> {
        self.calls.lock().unwrap().push(post_text.to_string());
        if self.failing_texts.iter().any(|t| t == post_text) {
            bail!("MockClassifier: classify forced failure");
        }
        Ok(self
            .responses
            .get(post_text)
            .cloned()
            .unwrap_or_else(Classification::none))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_store_marks_and_counts() {
        let store = MockPostStore::new().with_real_post("hello");

        assert!(!store.is_processed(1));
        let marked = store.mark_processed(1).await.unwrap();
        assert!(marked.unwrap().processed);
        assert!(store.is_processed(1));
        assert_eq!(store.mark_count(1), 1);
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn mock_store_failure_flags_bail() {
        let store = MockPostStore::new().failing_creates();

        let err = store.create_post(&NewPost::real("x")).await.unwrap_err();

        assert!(err.to_string().contains("forced failure"));
        assert_eq!(store.posts_created(), 0);
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn mock_store_filters_synthetic_posts() {
        let store = MockPostStore::new()
            .with_real_post("real")
            .with_unprocessed_synthetic("fake", 1);

        let real_only = store.unprocessed_posts(10, false).await.unwrap();
        assert_eq!(real_only.len(), 1);

        let all = store.unprocessed_posts(10, true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn mock_composer_fails_where_told() {
        let composer = MockComposer::new().failing();
        assert!(composer.generate("s", "p", "st", "en").await.is_err());
        assert_eq!(composer.calls(), 1);

        let composer = MockComposer::new().failing_on_call(2);
        assert!(composer.generate("s", "p", "st", "en").await.is_ok());
        assert!(composer.generate("s", "p", "st", "en").await.is_err());
        assert!(composer.generate("s", "p", "st", "en").await.is_ok());
    }

    #[tokio::test]
    async fn mock_classifier_defaults_to_none() {
        let classifier = MockClassifier::new().on_text("bad news", confirmed_classification(90));

        let scripted = classifier.classify("bad news").await.unwrap();
        assert!(scripted.is_incident);

        let unknown = classifier.classify("whatever").await.unwrap();
        assert_eq!(unknown, Classification::none());

        assert_eq!(classifier.calls(), vec!["bad news", "whatever"]);
    }
}
