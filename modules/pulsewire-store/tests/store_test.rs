//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use pulsewire_store::{NewIncident, NewPost, PgStore};
use sqlx::PgPool;

/// Get a test database pool, or skip if no test DB is available.
async fn test_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    let store = PgStore::new(pool.clone());
    store.ensure_schema().await.ok()?;

    // Clean slate for each test
    sqlx::query("TRUNCATE user_posts, confirmed_incidents RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .ok()?;

    Some(store)
}

fn incident_for(post_id: i64, confidence: i32) -> NewIncident {
    NewIncident {
        source_post_id: post_id,
        incident_type: Some("arson".to_string()),
        summary: Some("Dumpster fire spread to a storefront awning.".to_string()),
        confidence,
        location_country: Some("US".to_string()),
        location_area: Some("Riverside".to_string()),
    }
}

// =========================================================================
// Post lifecycle
// =========================================================================

#[tokio::test]
async fn create_post_assigns_id_and_defaults() {
    let Some(store) = test_store().await else {
        return;
    };

    let post = store
        .create_post(&NewPost::real("Loud bang heard near the depot"))
        .await
        .unwrap();

    assert!(post.id > 0);
    assert!(!post.processed);
    assert!(!post.is_synthetic);
    assert!(post.persona.is_none());
    assert!(post.seed_post_id.is_none());
}

#[tokio::test]
async fn synthetic_post_keeps_provenance() {
    let Some(store) = test_store().await else {
        return;
    };

    let seed = store.create_post(&NewPost::real("seed")).await.unwrap();
    let post = store
        .create_post(
            &NewPost::synthetic("Something just went down by the depot #breaking", seed.id)
                .with_persona("commuter")
                .with_lang("en")
                .with_hashtags("#breaking"),
        )
        .await
        .unwrap();

    let fetched = store.post_by_id(post.id).await.unwrap().unwrap();
    assert!(fetched.is_synthetic);
    assert_eq!(fetched.seed_post_id, Some(seed.id));
    assert_eq!(fetched.persona.as_deref(), Some("commuter"));
    assert_eq!(fetched.lang.as_deref(), Some("en"));
    assert_eq!(fetched.hashtags.as_deref(), Some("#breaking"));
}

#[tokio::test]
async fn post_by_id_returns_none_for_unknown_id() {
    let Some(store) = test_store().await else {
        return;
    };

    assert!(store.post_by_id(424242).await.unwrap().is_none());
}

#[tokio::test]
async fn latest_real_post_skips_synthetic_rows() {
    let Some(store) = test_store().await else {
        return;
    };

    let first = store.create_post(&NewPost::real("older real")).await.unwrap();
    let newer = store.create_post(&NewPost::real("newer real")).await.unwrap();
    store
        .create_post(&NewPost::synthetic("synthetic noise", first.id))
        .await
        .unwrap();

    let latest = store.latest_real_post().await.unwrap().unwrap();
    assert_eq!(latest.id, newer.id);
}

#[tokio::test]
async fn latest_real_post_is_none_on_empty_table() {
    let Some(store) = test_store().await else {
        return;
    };

    assert!(store.latest_real_post().await.unwrap().is_none());
}

// =========================================================================
// Unprocessed queue semantics
// =========================================================================

#[tokio::test]
async fn unprocessed_posts_come_back_oldest_first() {
    let Some(store) = test_store().await else {
        return;
    };

    let a = store.create_post(&NewPost::real("first")).await.unwrap();
    let b = store.create_post(&NewPost::real("second")).await.unwrap();
    let c = store.create_post(&NewPost::real("third")).await.unwrap();

    let batch = store.unprocessed_posts(10, false).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
}

#[tokio::test]
async fn unprocessed_posts_respect_limit() {
    let Some(store) = test_store().await else {
        return;
    };

    for i in 0..5 {
        store
            .create_post(&NewPost::real(format!("post {i}")))
            .await
            .unwrap();
    }

    let batch = store.unprocessed_posts(2, false).await.unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].text, "post 0");
}

#[tokio::test]
async fn unprocessed_posts_exclude_synthetic_unless_asked() {
    let Some(store) = test_store().await else {
        return;
    };

    let seed = store.create_post(&NewPost::real("real one")).await.unwrap();
    store
        .create_post(&NewPost::synthetic("fake one", seed.id))
        .await
        .unwrap();

    let real_only = store.unprocessed_posts(10, false).await.unwrap();
    assert_eq!(real_only.len(), 1);
    assert_eq!(real_only[0].id, seed.id);

    let everything = store.unprocessed_posts(10, true).await.unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn mark_processed_flips_flag_and_hides_post_from_queue() {
    let Some(store) = test_store().await else {
        return;
    };

    let post = store.create_post(&NewPost::real("soon done")).await.unwrap();

    let updated = store.mark_processed(post.id).await.unwrap().unwrap();
    assert!(updated.processed);

    let remaining = store.unprocessed_posts(10, true).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn mark_processed_returns_none_for_unknown_id() {
    let Some(store) = test_store().await else {
        return;
    };

    assert!(store.mark_processed(424242).await.unwrap().is_none());
}

// =========================================================================
// Incidents
// =========================================================================

#[tokio::test]
async fn create_incident_round_trips_all_fields() {
    let Some(store) = test_store().await else {
        return;
    };

    let post = store.create_post(&NewPost::real("smoke report")).await.unwrap();
    let incident = store.create_incident(&incident_for(post.id, 91)).await.unwrap();

    assert!(incident.id > 0);
    assert_eq!(incident.source_post_id, post.id);
    assert_eq!(incident.incident_type.as_deref(), Some("arson"));
    assert_eq!(incident.confidence, 91);
    assert_eq!(incident.location_country.as_deref(), Some("US"));
    assert_eq!(incident.location_area.as_deref(), Some("Riverside"));
}

#[tokio::test]
async fn recent_incidents_come_back_newest_first() {
    let Some(store) = test_store().await else {
        return;
    };

    let post = store.create_post(&NewPost::real("seed")).await.unwrap();
    store.create_incident(&incident_for(post.id, 81)).await.unwrap();
    let second = store.create_incident(&incident_for(post.id, 95)).await.unwrap();

    let incidents = store.recent_incidents(10).await.unwrap();
    assert_eq!(incidents.len(), 2);
    assert_eq!(incidents[0].id, second.id);
}

#[tokio::test]
async fn recent_posts_come_back_newest_first() {
    let Some(store) = test_store().await else {
        return;
    };

    store.create_post(&NewPost::real("old")).await.unwrap();
    let newest = store.create_post(&NewPost::real("new")).await.unwrap();

    let posts = store.recent_posts(1).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, newest.id);
}
