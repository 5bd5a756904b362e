//! Integration tests for VectorIndex.
//! Requires a Postgres instance with pgvector. Set DATABASE_TEST_URL or
//! these tests are skipped.

use chrono::Utc;
use contex_core::types::ContextNode;
use contex_vectorindex::VectorIndex;
use serde_json::json;
use sqlx::PgPool;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(&pool).await.ok()?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS context_nodes (
            project_id   TEXT         NOT NULL,
            node_key     TEXT         NOT NULL,
            data_key     TEXT         NOT NULL,
            description  TEXT         NOT NULL,
            payload      JSONB        NOT NULL,
            embedding    vector(384)  NOT NULL,
            content_hash TEXT         NOT NULL,
            created_at   TIMESTAMPTZ  NOT NULL DEFAULT now(),
            PRIMARY KEY (project_id, node_key)
        )
        "#,
    )
    .execute(&pool)
    .await
    .ok()?;

    sqlx::query("TRUNCATE context_nodes").execute(&pool).await.ok()?;

    Some(pool)
}

fn unit_vector(hot_index: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[hot_index] = 1.0;
    v
}

fn node(project: &str, key: &str, embedding: Vec<f32>) -> ContextNode {
    ContextNode {
        project_id: project.to_string(),
        data_key: key.to_string(),
        node_key: key.to_string(),
        description: format!("description for {key}"),
        payload: json!({"k": key}),
        embedding,
        content_hash: "hash".to_string(),
        created_at: Utc::now(),
    }
}

// =========================================================================
// Basic behavior tests
// =========================================================================

#[tokio::test]
async fn upsert_then_search_finds_exact_match() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();
    index.upsert(&node("p1", "b", unit_vector(1))).await.unwrap();

    let hits = index.search("p1", &unit_vector(0), 5, 0.5).await.unwrap();

    assert_eq!(hits[0].node_key, "a");
    assert!(hits[0].similarity > 0.99);
}

#[tokio::test]
async fn upsert_same_node_key_replaces_atomically() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();
    index.upsert(&node("p1", "a", unit_vector(1))).await.unwrap();

    let all = index.list("p1").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].embedding[1], 1.0);
}

#[tokio::test]
async fn delete_removes_the_node() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();
    index.delete("p1", "a").await.unwrap();

    let all = index.list("p1").await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn search_respects_threshold() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();
    index.upsert(&node("p1", "b", unit_vector(1))).await.unwrap();

    // Orthogonal vectors have cosine similarity 0, below any positive threshold.
    let hits = index.search("p1", &unit_vector(0), 5, 0.9).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node_key, "a");
}

#[tokio::test]
async fn search_is_isolated_per_project() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();
    index.upsert(&node("p2", "a", unit_vector(0))).await.unwrap();

    let hits = index.search("p1", &unit_vector(0), 10, 0.0).await.unwrap();
    assert_eq!(hits.len(), 1);
}

// =========================================================================
// Adversarial tests — try to break the implementation
// =========================================================================

#[tokio::test]
async fn top_k_zero_returns_empty_no_error() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();

    let hits = index.search("p1", &unit_vector(0), 0, 0.0).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn ties_are_broken_lexicographically_by_node_key() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    // Identical embeddings across nodes produce identical similarity.
    index.upsert(&node("p1", "zebra", unit_vector(0))).await.unwrap();
    index.upsert(&node("p1", "apple", unit_vector(0))).await.unwrap();
    index.upsert(&node("p1", "mango", unit_vector(0))).await.unwrap();

    let hits = index.search("p1", &unit_vector(0), 10, 0.0).await.unwrap();
    let keys: Vec<&str> = hits.iter().map(|h| h.node_key.as_str()).collect();
    assert_eq!(keys, vec!["apple", "mango", "zebra"]);
}

#[tokio::test]
async fn delete_of_nonexistent_node_is_not_an_error() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.delete("p1", "does-not-exist").await.unwrap();
}

#[tokio::test]
async fn similarity_equal_to_threshold_is_included() {
    let Some(pool) = test_pool().await else { return };
    let index = VectorIndex::new(pool);

    index.upsert(&node("p1", "a", unit_vector(0))).await.unwrap();

    let hits = index.search("p1", &unit_vector(0), 5, 1.0).await.unwrap();
    assert_eq!(hits.len(), 1);
}
