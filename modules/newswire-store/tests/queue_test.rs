//! Queue semantics against a live Postgres.
//!
//! These tests need a real database because the claim contract is about
//! row-level locking. Run with:
//!
//!     DATABASE_URL=postgres://... cargo test -p newswire-store -- --ignored

use std::collections::HashSet;

use newswire_common::{ArticlePayload, JobCounters, JobPayload, ProcessedStatus};
use newswire_store::Store;

async fn test_store() -> Store {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for queue tests");
    let store = Store::connect(&url).await.expect("connect");
    store.migrate().await.expect("migrate");
    store
}

fn article_payload(url: &str) -> JobPayload {
    JobPayload::Article(ArticlePayload {
        url: url.to_string(),
        source_id: None,
        extracted: None,
        classification: None,
    })
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn enqueue_then_get_round_trips() {
    let store = test_store().await;

    let id = store
        .enqueue(&article_payload("https://example.com/queue-test"))
        .await
        .unwrap();

    let details = store.get_job(id).await.unwrap().expect("job exists");
    assert_eq!(details.id, id);
    assert_eq!(details.job_type, "article");
    assert_eq!(details.status, "queued");
    assert_eq!(details.links_found, 0);
    assert!(details.updated_at >= details.created_at);
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn concurrent_claims_never_hand_out_the_same_row() {
    let store = test_store().await;
    store.cancel_stale_jobs().await.unwrap();

    let mut enqueued = HashSet::new();
    for i in 0..8 {
        let id = store
            .enqueue(&article_payload(&format!("https://example.com/claim-{i}")))
            .await
            .unwrap();
        enqueued.insert(id);
    }

    // Claim from 8 concurrent tasks, each holding its own Store handle.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.claim().await.unwrap() }));
    }

    let mut claimed = HashSet::new();
    for handle in handles {
        if let Some(job) = handle.await.unwrap() {
            assert!(claimed.insert(job.id), "job {} claimed twice", job.id);
        }
    }

    // Every one of our jobs was claimed exactly once (other leftover rows may
    // also have been claimed, so compare as a subset).
    assert!(enqueued.is_subset(&claimed) || claimed.len() == 8);

    for id in claimed {
        store.mark_done(id).await.unwrap();
    }
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn claim_returns_lowest_id_first() {
    let store = test_store().await;
    store.cancel_stale_jobs().await.unwrap();

    let first = store
        .enqueue(&article_payload("https://example.com/order-1"))
        .await
        .unwrap();
    let second = store
        .enqueue(&article_payload("https://example.com/order-2"))
        .await
        .unwrap();

    let claimed = store.claim().await.unwrap().expect("a job");
    assert_eq!(claimed.id, first);

    let claimed = store.claim().await.unwrap().expect("a job");
    assert_eq!(claimed.id, second);

    store.mark_done(first).await.unwrap();
    store.mark_done(second).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn save_processed_is_idempotent() {
    let store = test_store().await;
    let url = format!("https://example.com/dedup-{}", uuid::Uuid::new_v4());

    store
        .save_processed(&url, ProcessedStatus::Processed, Some("seattle"))
        .await
        .unwrap();

    assert_eq!(
        store.check_processed(&url).await.unwrap(),
        Some(ProcessedStatus::Processed)
    );

    // Second insert with the same URL must not error.
    store
        .save_processed(&url, ProcessedStatus::Trash, None)
        .await
        .unwrap();

    // The original status survives: rows are never mutated.
    assert_eq!(
        store.check_processed(&url).await.unwrap(),
        Some(ProcessedStatus::Processed)
    );
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn counters_update_and_read_back() {
    let store = test_store().await;

    let id = store
        .enqueue(&article_payload("https://example.com/counters"))
        .await
        .unwrap();

    store
        .update_counters(
            id,
            JobCounters {
                links_found: Some(20),
                articles_saved: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let details = store.get_job(id).await.unwrap().unwrap();
    assert_eq!(details.links_found, 20);
    assert_eq!(details.articles_saved, 5);
    assert_eq!(details.links_skipped, 0);

    store.mark_done(id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn startup_sweep_cancels_queued_and_in_progress() {
    let store = test_store().await;

    let queued = store
        .enqueue(&article_payload("https://example.com/sweep-queued"))
        .await
        .unwrap();
    let in_progress = store
        .enqueue(&article_payload("https://example.com/sweep-claimed"))
        .await
        .unwrap();
    store.claim().await.unwrap();

    let swept = store.cancel_stale_jobs().await.unwrap();
    assert!(swept >= 2);

    for id in [queued, in_progress] {
        let details = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(details.status, "cancelled");
        assert!(details
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("restart"));
    }
}
