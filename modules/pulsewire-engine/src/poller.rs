//! Classification poller: drains unprocessed posts and records incidents.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use pulsewire_common::PulseWireError;

use crate::classifier::PostClassifier;
use crate::traits::PostStore;

#[derive(Debug, Clone, TypedBuilder)]
pub struct PollerConfig {
    #[builder(default = Duration::from_secs(10))]
    pub interval: Duration,
    #[builder(default = 50)]
    pub batch_limit: i64,
    /// Persist incidents at or above this confidence.
    #[builder(default = 80)]
    pub threshold: u8,
    #[builder(default = false)]
    pub include_synthetic: bool,
}

/// What one polling pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchStats {
    pub fetched: usize,
    pub processed: usize,
    pub incidents: usize,
    pub failures: usize,
}

pub struct ClassificationPoller<S, C> {
    store: Arc<S>,
    classifier: Arc<C>,
    config: PollerConfig,
}

impl<S, C> ClassificationPoller<S, C>
where
    S: PostStore,
    C: PostClassifier,
{
    pub fn new(store: Arc<S>, classifier: Arc<C>, config: PollerConfig) -> Self {
        Self {
            store,
            classifier,
            config,
        }
    }

    /// Poll until `shutdown` flips. A failed pass is logged and retried at
    /// the next interval; it never ends the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_limit = self.config.batch_limit,
            threshold = self.config.threshold,
            include_synthetic = self.config.include_synthetic,
            "Classification poller running"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.poll_once(&shutdown).await {
                Ok(stats) if stats.fetched > 0 => {
                    info!(
                        fetched = stats.fetched,
                        processed = stats.processed,
                        incidents = stats.incidents,
                        failures = stats.failures,
                        "Polling pass complete"
                    );
                }
                Ok(_) => debug!("No unprocessed posts"),
                Err(e) => warn!(error = %e, "Polling pass failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Classification poller stopped");
    }

    /// One batch pass. Every fetched post is marked processed exactly once,
    /// whatever its classification or persistence outcome, so no post is
    /// classified twice.
    pub async fn poll_once(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<BatchStats, PulseWireError> {
        let posts = self
            .store
            .unprocessed_posts(self.config.batch_limit, self.config.include_synthetic)
            .await
            .map_err(|e| PulseWireError::Store(e.to_string()))?;

        let mut stats = BatchStats {
            fetched: posts.len(),
            ..BatchStats::default()
        };

        for post in posts {
            if *shutdown.borrow() {
                break;
            }

            match self.classifier.classify(&post.text).await {
                Ok(c) if c.is_incident && c.confidence >= self.config.threshold => {
                    info!(
                        post_id = post.id,
                        confidence = c.confidence,
                        incident_type = c.incident_type.as_deref().unwrap_or("unspecified"),
                        "Confirmed incident"
                    );
                    match self.store.create_incident(&c.to_incident(post.id)).await {
                        Ok(_) => stats.incidents += 1,
                        Err(e) => {
                            let failure = PulseWireError::Store(e.to_string());
                            warn!(post_id = post.id, error = %failure, "Failed to persist incident");
                            stats.failures += 1;
                        }
                    }
                }
                Ok(c) => {
                    debug!(post_id = post.id, confidence = c.confidence, "No incident");
                }
                Err(e) => {
                    let failure = PulseWireError::Classification(e.to_string());
                    warn!(
                        post_id = post.id,
                        error = %failure,
                        "Classification failed, post will still be marked"
                    );
                    stats.failures += 1;
                }
            }

            // Always mark, whatever happened above.
            match self.store.mark_processed(post.id).await {
                Ok(Some(_)) => stats.processed += 1,
                Ok(None) => {
                    warn!(post_id = post.id, "Post vanished before it could be marked")
                }
                Err(e) => {
                    let failure = PulseWireError::Store(e.to_string());
                    warn!(post_id = post.id, error = %failure, "Failed to mark post processed");
                    stats.failures += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{confirmed_classification, MockClassifier, MockPostStore};

    fn poller_with(
        store: MockPostStore,
        classifier: MockClassifier,
        config: PollerConfig,
    ) -> ClassificationPoller<MockPostStore, MockClassifier> {
        ClassificationPoller::new(Arc::new(store), Arc::new(classifier), config)
    }

    fn default_config() -> PollerConfig {
        PollerConfig::builder().build()
    }

    fn idle_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    // =========================================================================
    // Marking
    // =========================================================================

    #[tokio::test]
    async fn every_fetched_post_is_marked_exactly_once() {
        let store = MockPostStore::new()
            .with_real_post("quiet evening at the park")
            .with_real_post("great tacos on 3rd")
            .with_real_post("anyone else hear that?");
        let poller = poller_with(store, MockClassifier::new(), default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.incidents, 0);
        for id in 1..=3 {
            assert!(poller.store.is_processed(id));
            assert_eq!(poller.store.mark_count(id), 1);
        }
    }

    #[tokio::test]
    async fn batch_limit_caps_a_pass() {
        let mut store = MockPostStore::new();
        for i in 0..7 {
            store = store.with_real_post(&format!("post {i}"));
        }
        let config = PollerConfig::builder().batch_limit(5).build();
        let poller = poller_with(store, MockClassifier::new(), config);
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.fetched, 5);
        assert_eq!(stats.processed, 5);
        assert!(!poller.store.is_processed(6));
        assert!(!poller.store.is_processed(7));
    }

    #[tokio::test]
    async fn already_processed_posts_are_left_alone() {
        let store = MockPostStore::new()
            .with_processed_post("old news")
            .with_processed_post("older news");
        let poller = poller_with(store, MockClassifier::new(), default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats, BatchStats::default());
        assert_eq!(poller.store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn synthetic_posts_are_skipped_unless_included() {
        let excluded = poller_with(
            MockPostStore::new().with_unprocessed_synthetic("fake chatter", 1),
            MockClassifier::new(),
            default_config(),
        );
        let (_tx, rx) = idle_shutdown();
        let stats = excluded.poll_once(&rx).await.unwrap();
        assert_eq!(stats.fetched, 0);
        assert!(!excluded.store.is_processed(1));

        let included = poller_with(
            MockPostStore::new().with_unprocessed_synthetic("fake chatter", 1),
            MockClassifier::new(),
            PollerConfig::builder().include_synthetic(true).build(),
        );
        let stats = included.poll_once(&rx).await.unwrap();
        assert_eq!(stats.fetched, 1);
        assert!(included.store.is_processed(1));
    }

    // =========================================================================
    // Threshold
    // =========================================================================

    #[tokio::test]
    async fn incident_persists_only_at_or_above_threshold() {
        let store = MockPostStore::new()
            .with_real_post("shots fired near the market")
            .with_real_post("maybe something happened?");
        let classifier = MockClassifier::new()
            .on_text("shots fired near the market", confirmed_classification(95))
            .on_text("maybe something happened?", confirmed_classification(79));
        let poller = poller_with(store, classifier, default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.incidents, 1);
        assert_eq!(poller.store.incident_count(), 1);
        assert_eq!(poller.store.incidents_for(1).len(), 1);
        assert!(poller.store.incidents_for(2).is_empty());
        assert!(poller.store.is_processed(1));
        assert!(poller.store.is_processed(2));
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let store = MockPostStore::new()
            .with_real_post("car drove into the bus stop")
            .with_real_post("loud bang, probably nothing");
        let classifier = MockClassifier::new()
            .on_text("car drove into the bus stop", confirmed_classification(70))
            .on_text("loud bang, probably nothing", confirmed_classification(69));
        let config = PollerConfig::builder().threshold(70).build();
        let poller = poller_with(store, classifier, config);
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.incidents, 1);
        assert_eq!(poller.store.incidents_for(1).len(), 1);
        assert!(poller.store.incidents_for(2).is_empty());
    }

    #[tokio::test]
    async fn negative_verdict_never_persists_regardless_of_confidence() {
        let store = MockPostStore::new().with_real_post("the game was wild last night");
        // Default classification: not an incident, whatever the confidence.
        let poller = poller_with(store, MockClassifier::new(), default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.incidents, 0);
        assert_eq!(poller.store.incident_count(), 0);
        assert!(poller.store.is_processed(1));
    }

    // =========================================================================
    // Failure isolation
    // =========================================================================

    #[tokio::test]
    async fn classify_failure_mid_batch_is_isolated() {
        let mut store = MockPostStore::new();
        for i in 1..=5 {
            store = store.with_real_post(&format!("post {i}"));
        }
        let classifier = MockClassifier::new()
            .failing_on("post 3")
            .on_text("post 5", confirmed_classification(90));
        let poller = poller_with(store, classifier, default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.fetched, 5);
        assert_eq!(stats.processed, 5);
        assert_eq!(stats.incidents, 1);
        assert_eq!(stats.failures, 1);
        for id in 1..=5 {
            assert_eq!(poller.store.mark_count(id), 1);
        }
    }

    #[tokio::test]
    async fn incident_write_failure_still_marks_the_post() {
        let store = MockPostStore::new()
            .with_real_post("warehouse fire spreading")
            .failing_incidents();
        let classifier = MockClassifier::new()
            .on_text("warehouse fire spreading", confirmed_classification(97));
        let poller = poller_with(store, classifier, default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.incidents, 0);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.processed, 1);
        assert!(poller.store.is_processed(1));
    }

    #[tokio::test]
    async fn mark_failure_is_counted_and_the_pass_continues() {
        let store = MockPostStore::new()
            .with_real_post("one")
            .with_real_post("two")
            .failing_marks();
        let poller = poller_with(store, MockClassifier::new(), default_config());
        let (_tx, rx) = idle_shutdown();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.fetched, 2);
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.failures, 2);
        assert_eq!(poller.store.mark_count(1), 1);
        assert_eq!(poller.store.mark_count(2), 1);
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_pass() {
        let store = MockPostStore::new()
            .with_real_post("unreachable")
            .failing_fetches();
        let poller = poller_with(store, MockClassifier::new(), default_config());
        let (_tx, rx) = idle_shutdown();

        let err = poller.poll_once(&rx).await.unwrap_err();

        assert!(matches!(err, PulseWireError::Store(_)));
        assert_eq!(poller.store.mutation_count(), 0);
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    #[tokio::test]
    async fn preset_shutdown_stops_before_the_first_item() {
        let store = MockPostStore::new()
            .with_real_post("one")
            .with_real_post("two");
        let poller = poller_with(store, MockClassifier::new(), default_config());
        let (tx, rx) = idle_shutdown();
        tx.send(true).unwrap();

        let stats = poller.poll_once(&rx).await.unwrap();

        assert_eq!(stats.fetched, 2);
        assert_eq!(stats.processed, 0);
        assert!(!poller.store.is_processed(1));
        assert!(poller.classifier.calls().is_empty());
    }

    #[tokio::test]
    async fn run_exits_when_shutdown_flips() {
        let poller = Arc::new(poller_with(
            MockPostStore::new(),
            MockClassifier::new(),
            PollerConfig::builder()
                .interval(Duration::from_millis(10))
                .build(),
        ));
        let (tx, rx) = idle_shutdown();

        let handle = tokio::spawn({
            let poller = Arc::clone(&poller);
            async move { poller.run(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }
}
