//! Generation worker: fans a seed report out into paced synthetic posts.
//!
//! Jobs arrive on an in-process queue and run concurrently. Each job samples
//! one exponential wait per post up front, then races every emission's sleep
//! against the shutdown signal, so a stopping worker abandons pending waits
//! without cutting off calls already in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use pulsewire_common::PulseWireError;
use pulsewire_store::NewPost;

use crate::composer::TextGenerator;
use crate::personas::PersonaRegistry;
use crate::sampler::WeightedSampler;
use crate::schedule::{Pacing, PointProcess};
use crate::traits::PostStore;

/// Probability that a synthetic post gets hashtags appended.
const HASHTAG_PROBABILITY: f64 = 0.6;
/// At most this many hashtags per post.
const MAX_HASHTAGS: usize = 2;

/// Knobs for one worker instance. Fixed at construction; every job shares
/// them.
#[derive(Debug, Clone, TypedBuilder)]
pub struct GenerationConfig {
    /// Posts per job.
    #[builder(default = 60)]
    pub count: usize,
    #[builder(default = Pacing::Window(20.0))]
    pub pacing: Pacing,
    pub personas: HashMap<String, f64>,
    pub languages: HashMap<String, f64>,
    #[builder(default)]
    pub hashtag_pool: Vec<String>,
}

/// What one fan-out job did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobStats {
    pub requested: usize,
    pub persisted: usize,
    pub failed: usize,
}

enum EmissionOutcome {
    Persisted,
    Failed,
    Cancelled,
}

/// Fans seed posts out into synthetic posts.
///
/// `enqueue` never blocks; jobs queue in order and run concurrently once the
/// dispatch loop is started. After `stop` the queue stays closed for good.
pub struct GenerationWorker<S, G> {
    inner: Arc<WorkerInner<S, G>>,
    job_tx: mpsc::UnboundedSender<i64>,
    job_rx: Mutex<Option<mpsc::UnboundedReceiver<i64>>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Everything a running job needs, shared across emission tasks.
struct WorkerInner<S, G> {
    store: Arc<S>,
    composer: Arc<G>,
    registry: Arc<PersonaRegistry>,
    config: GenerationConfig,
    persona_sampler: WeightedSampler,
    language_sampler: WeightedSampler,
    shutdown_tx: watch::Sender<bool>,
}

impl<S, G> GenerationWorker<S, G>
where
    S: PostStore + 'static,
    G: TextGenerator + 'static,
{
    /// Validates both weight maps up front; a bad distribution is a
    /// construction error, never a mid-job one.
    pub fn new(
        store: Arc<S>,
        composer: Arc<G>,
        registry: Arc<PersonaRegistry>,
        config: GenerationConfig,
    ) -> Result<Self, PulseWireError> {
        let persona_sampler = WeightedSampler::new(&config.personas)?;
        let language_sampler = WeightedSampler::new(&config.languages)?;
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(WorkerInner {
                store,
                composer,
                registry,
                config,
                persona_sampler,
                language_sampler,
                shutdown_tx,
            }),
            job_tx,
            job_rx: Mutex::new(Some(job_rx)),
            dispatch: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Queue a fan-out job for `seed_id`. Never blocks. Jobs may be queued
    /// before `start`; they sit in the channel until the dispatch loop runs.
    pub fn enqueue(&self, seed_id: i64) -> Result<(), PulseWireError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PulseWireError::QueueClosed);
        }
        self.job_tx
            .send(seed_id)
            .map_err(|_| PulseWireError::QueueClosed)
    }

    /// Spawn the dispatch loop. Safe to call repeatedly; only the first call
    /// does anything.
    pub async fn start(&self) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Generation worker already stopped, ignoring start");
            return;
        }

        let mut rx_slot = self.job_rx.lock().await;
        let Some(mut job_rx) = rx_slot.take() else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        let mut shutdown = self.inner.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut jobs: Vec<JoinHandle<()>> = Vec::new();
            loop {
                tokio::select! {
                    maybe_seed = job_rx.recv() => match maybe_seed {
                        Some(seed_id) => {
                            jobs.retain(|job| !job.is_finished());
                            let inner = Arc::clone(&inner);
                            jobs.push(tokio::spawn(async move {
                                if let Err(e) = inner.run_job(seed_id).await {
                                    warn!(seed_id, error = %e, "Generation job failed");
                                }
                            }));
                        }
                        None => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
            // Jobs watch the same shutdown signal; wait for them to settle.
            join_all(jobs).await;
        });

        *self.dispatch.lock().await = Some(handle);
    }

    /// Close the queue and wind the dispatch loop down, waiting up to `wait`
    /// for in-flight work. The worker cannot be restarted afterwards.
    pub async fn stop(&self, wait: Duration) {
        self.closed.store(true, Ordering::SeqCst);
        // send_replace updates the value even with no live receivers.
        let _ = self.inner.shutdown_tx.send_replace(true);

        let handle = self.dispatch.lock().await.take();
        if let Some(handle) = handle {
            match timeout(wait, handle).await {
                Ok(Ok(())) => info!("Generation worker stopped"),
                Ok(Err(e)) => warn!(error = %e, "Generation dispatch task panicked"),
                Err(_) => warn!(
                    wait_secs = wait.as_secs_f64(),
                    "Generation worker still winding down after stop timeout"
                ),
            }
        }
    }

    /// Run one fan-out job to completion. The dispatch loop calls this for
    /// queued jobs; direct callers may await it without going through the
    /// queue.
    pub async fn run_job(&self, seed_id: i64) -> Result<JobStats, PulseWireError> {
        Arc::clone(&self.inner).run_job(seed_id).await
    }
}

impl<S, G> WorkerInner<S, G>
where
    S: PostStore + 'static,
    G: TextGenerator + 'static,
{
    async fn run_job(self: Arc<Self>, seed_id: i64) -> Result<JobStats, PulseWireError> {
        let job_id = Uuid::new_v4();

        let seed = self
            .store
            .post_by_id(seed_id)
            .await
            .map_err(|e| PulseWireError::Store(e.to_string()))?;

        let Some(seed) = seed else {
            let missing = PulseWireError::SeedNotFound(seed_id);
            warn!(%job_id, error = %missing, "Skipping generation job");
            return Ok(JobStats {
                requested: self.config.count,
                ..JobStats::default()
            });
        };

        let process = PointProcess::for_job(self.config.pacing, self.config.count);
        let waits = {
            let mut rng = rand::rng();
            process.draw_waits(self.config.count, &mut rng)
        };

        info!(%job_id, seed_id, count = self.config.count, "Generation job started");

        let seed_text: Arc<str> = Arc::from(seed.text.as_str());
        let mut emissions = Vec::with_capacity(waits.len());
        for wait_secs in waits {
            let inner = Arc::clone(&self);
            let seed_text = Arc::clone(&seed_text);
            let shutdown = self.shutdown_tx.subscribe();
            emissions.push(tokio::spawn(async move {
                inner.emit_one(seed_id, seed_text, wait_secs, shutdown).await
            }));
        }

        let mut stats = JobStats {
            requested: self.config.count,
            ..JobStats::default()
        };
        for outcome in join_all(emissions).await {
            match outcome {
                Ok(EmissionOutcome::Persisted) => stats.persisted += 1,
                Ok(EmissionOutcome::Failed) => stats.failed += 1,
                Ok(EmissionOutcome::Cancelled) => {}
                Err(e) => {
                    warn!(%job_id, error = %e, "Emission task panicked");
                    stats.failed += 1;
                }
            }
        }

        info!(
            %job_id,
            seed_id,
            requested = stats.requested,
            persisted = stats.persisted,
            failed = stats.failed,
            "Generation job finished"
        );

        Ok(stats)
    }

    /// One emission: wait out the sampled delay, sample persona and language,
    /// compose, and persist. Failures are logged and absorbed so sibling
    /// emissions keep going.
    async fn emit_one(
        &self,
        seed_id: i64,
        seed_text: Arc<str>,
        wait_secs: f64,
        mut shutdown: watch::Receiver<bool>,
    ) -> EmissionOutcome {
        if *shutdown.borrow() {
            return EmissionOutcome::Cancelled;
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs_f64(wait_secs)) => {}
            _ = shutdown.changed() => return EmissionOutcome::Cancelled,
        }

        // ThreadRng is not Send; sample everything before the next await.
        let (persona, lang, tags) = {
            let mut rng = rand::rng();
            let persona = self.persona_sampler.sample(&mut rng).to_string();
            let lang = self.language_sampler.sample(&mut rng).to_string();
            let tags = pick_hashtags(&self.config.hashtag_pool, &mut rng);
            (persona, lang, tags)
        };

        let style = self.registry.style_for(&persona).await;

        let text = match self
            .composer
            .generate(&seed_text, &persona, &style, &lang)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                let failure = PulseWireError::Generation(e.to_string());
                warn!(seed_id, persona = %persona, error = %failure, "Emission failed");
                return EmissionOutcome::Failed;
            }
        };

        let (text, hashtags) = match tags {
            Some(tags) => {
                let joined = tags.join(" ");
                (format!("{text} {joined}"), Some(joined))
            }
            None => (text, None),
        };

        let mut post = NewPost::synthetic(text, seed_id)
            .with_persona(persona.as_str())
            .with_lang(lang.as_str());
        if let Some(hashtags) = hashtags {
            post = post.with_hashtags(hashtags);
        }

        match self.store.create_post(&post).await {
            Ok(stored) => {
                debug!(
                    post_id = stored.id,
                    seed_id,
                    persona = %persona,
                    lang = %lang,
                    "Synthetic post persisted"
                );
                EmissionOutcome::Persisted
            }
            Err(e) => {
                let failure = PulseWireError::Store(e.to_string());
                warn!(seed_id, error = %failure, "Failed to persist synthetic post");
                EmissionOutcome::Failed
            }
        }
    }
}

/// With probability 0.6, pick 1-2 distinct tags from the pool.
fn pick_hashtags<R: Rng + ?Sized>(pool: &[String], rng: &mut R) -> Option<Vec<String>> {
    if pool.is_empty() || rng.random::<f64>() >= HASHTAG_PROBABILITY {
        return None;
    }
    let take = rng.random_range(1..=pool.len().min(MAX_HASHTAGS));
    Some(pool.choose_multiple(rng, take).cloned().collect())
}
