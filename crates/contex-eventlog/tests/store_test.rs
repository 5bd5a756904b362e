//! Integration tests for EventLog.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use contex_core::types::{AppendEvent, EventType};
use contex_eventlog::EventLog;
use serde_json::json;
use sqlx::PgPool;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            project_id  TEXT        NOT NULL,
            sequence    BIGINT      NOT NULL,
            event_type  TEXT        NOT NULL,
            payload     JSONB       NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (project_id, sequence)
        )
        "#,
    )
    .execute(&pool)
    .await
    .ok()?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_sequences (
            project_id TEXT PRIMARY KEY,
            next_seq   BIGINT NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&pool)
    .await
    .ok()?;

    sqlx::query("TRUNCATE events, project_sequences").execute(&pool).await.ok()?;

    Some(pool)
}

fn event(project: &str, key: &str) -> AppendEvent {
    AppendEvent::new(project, EventType::DataPublished, json!({"data_key": key}))
}

// =========================================================================
// Basic behavior tests
// =========================================================================

#[tokio::test]
async fn append_assigns_increasing_sequence() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    let a = log.append(event("p1", "a")).await.unwrap();
    let b = log.append(event("p1", "b")).await.unwrap();
    let c = log.append(event("p1", "c")).await.unwrap();

    assert_eq!((a, b, c), (1, 2, 3));
}

#[tokio::test]
async fn sequences_are_independent_per_project() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    let a1 = log.append(event("alpha", "x")).await.unwrap();
    let b1 = log.append(event("beta", "y")).await.unwrap();
    let a2 = log.append(event("alpha", "z")).await.unwrap();

    assert_eq!(a1, 1);
    assert_eq!(b1, 1);
    assert_eq!(a2, 2);
}

#[tokio::test]
async fn read_returns_events_strictly_after_since() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    for key in ["a", "b", "c"] {
        log.append(event("p1", key)).await.unwrap();
    }

    let events = log.read("p1", 1, 10).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sequence, 2);
    assert_eq!(events[1].sequence, 3);
}

#[tokio::test]
async fn length_reports_max_sequence() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    assert_eq!(log.length("p1").await.unwrap(), 0);

    log.append(event("p1", "a")).await.unwrap();
    log.append(event("p1", "b")).await.unwrap();

    assert_eq!(log.length("p1").await.unwrap(), 2);
}

#[tokio::test]
async fn read_paginates_with_limit() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    for i in 0..10 {
        log.append(event("p1", &format!("k{i}"))).await.unwrap();
    }

    let first_page = log.read("p1", 0, 4).await.unwrap();
    assert_eq!(first_page.len(), 4);
    assert_eq!(first_page.last().unwrap().sequence, 4);

    let second_page = log.read("p1", 4, 4).await.unwrap();
    assert_eq!(second_page.len(), 4);
    assert_eq!(second_page[0].sequence, 5);
}

// =========================================================================
// Adversarial tests — try to break the implementation
// =========================================================================

#[tokio::test]
async fn read_since_beyond_max_returns_empty_no_error() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    log.append(event("p1", "a")).await.unwrap();

    let events = log.read("p1", 1000, 10).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn top_k_zero_returns_empty_no_error() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    log.append(event("p1", "a")).await.unwrap();

    let events = log.read("p1", 0, 0).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn read_limit_above_max_is_clamped() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    for i in 0..5 {
        log.append(event("p1", &format!("k{i}"))).await.unwrap();
    }

    let events = log.read("p1", 0, 100_000).await.unwrap();
    assert_eq!(events.len(), 5);
}

#[tokio::test]
#[cfg(feature = "test-utils")]
async fn read_stops_at_a_simulated_gap() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool.clone());

    log.append(event("p1", "a")).await.unwrap();
    log.append(event("p1", "b")).await.unwrap();
    log.append(event("p1", "c")).await.unwrap();

    sqlx::query("DELETE FROM events WHERE project_id = 'p1' AND sequence = 2")
        .execute(&pool)
        .await
        .unwrap();

    let events = log.read("p1", 0, 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sequence, 1);

    let all = log.read_all_unchecked("p1").await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn concurrent_appends_to_same_project_produce_no_duplicates() {
    let Some(pool) = test_pool().await else { return };
    let log = EventLog::new(pool);

    let mut handles = Vec::new();
    for i in 0..20 {
        let log = log.clone();
        handles.push(tokio::spawn(async move {
            log.append(event("p1", &format!("k{i}"))).await.unwrap()
        }));
    }

    let mut sequences: Vec<i64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    sequences.sort();

    assert_eq!(sequences, (1..=20).collect::<Vec<_>>());
}
