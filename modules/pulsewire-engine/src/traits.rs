//! Seam between the workers and post persistence.
//!
//! The engine depends on this trait rather than on Postgres directly, so the
//! whole pipeline runs in unit tests against the in-memory mock in
//! `testing.rs` with no database and no network.

use anyhow::Result;
use async_trait::async_trait;

use pulsewire_store::{ConfirmedIncident, NewIncident, NewPost, PgStore, Post};

// ---------------------------------------------------------------------------
// PostStore
// ---------------------------------------------------------------------------

/// Everything the generation worker and the classification poller need from
/// post persistence.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: &NewPost) -> Result<Post>;

    async fn post_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Most recent non-synthetic post, if any.
    async fn latest_real_post(&self) -> Result<Option<Post>>;

    /// Oldest-first unprocessed posts, up to `limit`.
    async fn unprocessed_posts(&self, limit: i64, include_synthetic: bool) -> Result<Vec<Post>>;

    /// Returns the updated post, or `None` when the id is unknown.
    async fn mark_processed(&self, id: i64) -> Result<Option<Post>>;

    async fn create_incident(&self, incident: &NewIncident) -> Result<ConfirmedIncident>;

    async fn recent_incidents(&self, limit: i64) -> Result<Vec<ConfirmedIncident>>;
}

#[async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        PgStore::create_post(self, post).await
    }

    async fn post_by_id(&self, id: i64) -> Result<Option<Post>> {
        PgStore::post_by_id(self, id).await
    }

    async fn latest_real_post(&self) -> Result<Option<Post>> {
        PgStore::latest_real_post(self).await
    }

    async fn unprocessed_posts(&self, limit: i64, include_synthetic: bool) -> Result<Vec<Post>> {
        PgStore::unprocessed_posts(self, limit, include_synthetic).await
    }

    async fn mark_processed(&self, id: i64) -> Result<Option<Post>> {
        PgStore::mark_processed(self, id).await
    }

    async fn create_incident(&self, incident: &NewIncident) -> Result<ConfirmedIncident> {
        PgStore::create_incident(self, incident).await
    }

    async fn recent_incidents(&self, limit: i64) -> Result<Vec<ConfirmedIncident>> {
        PgStore::recent_incidents(self, limit).await
    }
}
