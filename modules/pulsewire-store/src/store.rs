//! PgStore: posts and confirmed incidents, backed by Postgres.
//!
//! Every read the pollers depend on is ordered explicitly; `created_at` ties
//! are broken by id so batch order is stable under fast inserts.

use anyhow::Result;
use sqlx::PgPool;

use crate::types::{ConfirmedIncident, NewIncident, NewPost, Post};

const POST_COLUMNS: &str =
    "id, text, created_at, processed, is_synthetic, persona, lang, seed_post_id, hashtags";
const INCIDENT_COLUMNS: &str =
    "id, source_post_id, incident_type, summary, confidence, location_country, location_area, created_at";

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// Post and incident store. One pool, cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create both tables when absent so a worker can run against a fresh
    /// database. Idempotent. Not a migration system.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_posts (
                id           BIGSERIAL    PRIMARY KEY,
                text         TEXT         NOT NULL,
                created_at   TIMESTAMPTZ  NOT NULL DEFAULT now(),
                processed    BOOLEAN      NOT NULL DEFAULT FALSE,
                is_synthetic BOOLEAN      NOT NULL DEFAULT FALSE,
                persona      TEXT,
                lang         TEXT,
                seed_post_id BIGINT,
                hashtags     TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS confirmed_incidents (
                id               BIGSERIAL    PRIMARY KEY,
                source_post_id   BIGINT       NOT NULL,
                incident_type    TEXT,
                summary          TEXT,
                confidence       INT          NOT NULL,
                location_country TEXT,
                location_area    TEXT,
                created_at       TIMESTAMPTZ  NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO user_posts (text, is_synthetic, persona, lang, seed_post_id, hashtags)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.text)
        .bind(post.is_synthetic)
        .bind(&post.persona)
        .bind(&post.lang)
        .bind(post.seed_post_id)
        .bind(&post.hashtags)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn post_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM user_posts
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Most recent real (non-synthetic) post, if any.
    pub async fn latest_real_post(&self) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM user_posts
            WHERE is_synthetic = FALSE
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Unprocessed posts, oldest first. Synthetic posts are skipped unless
    /// `include_synthetic`.
    pub async fn unprocessed_posts(&self, limit: i64, include_synthetic: bool) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM user_posts
            WHERE processed = FALSE AND ($2 OR is_synthetic = FALSE)
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .bind(include_synthetic)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Flag a post as examined. Returns the updated row, or `None` when the
    /// id is unknown.
    pub async fn mark_processed(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE user_posts
            SET processed = TRUE
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Newest posts first, for operator listings.
    pub async fn recent_posts(&self, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM user_posts
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn create_incident(&self, incident: &NewIncident) -> Result<ConfirmedIncident> {
        let row = sqlx::query_as::<_, ConfirmedIncident>(&format!(
            r#"
            INSERT INTO confirmed_incidents
                (source_post_id, incident_type, summary, confidence, location_country, location_area)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INCIDENT_COLUMNS}
            "#
        ))
        .bind(incident.source_post_id)
        .bind(&incident.incident_type)
        .bind(&incident.summary)
        .bind(incident.confidence)
        .bind(&incident.location_country)
        .bind(&incident.location_area)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Newest incidents first.
    pub async fn recent_incidents(&self, limit: i64) -> Result<Vec<ConfirmedIncident>> {
        let rows = sqlx::query_as::<_, ConfirmedIncident>(&format!(
            r#"
            SELECT {INCIDENT_COLUMNS}
            FROM confirmed_incidents
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// sqlx::FromRow for Post
// ---------------------------------------------------------------------------

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for Post {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Post {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
            processed: row.try_get("processed")?,
            is_synthetic: row.try_get("is_synthetic")?,
            persona: row.try_get("persona")?,
            lang: row.try_get("lang")?,
            seed_post_id: row.try_get("seed_post_id")?,
            hashtags: row.try_get("hashtags")?,
        })
    }
}

// ---------------------------------------------------------------------------
// sqlx::FromRow for ConfirmedIncident
// ---------------------------------------------------------------------------

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ConfirmedIncident {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(ConfirmedIncident {
            id: row.try_get("id")?,
            source_post_id: row.try_get("source_post_id")?,
            incident_type: row.try_get("incident_type")?,
            summary: row.try_get("summary")?,
            confidence: row.try_get("confidence")?,
            location_country: row.try_get("location_country")?,
            location_area: row.try_get("location_area")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
