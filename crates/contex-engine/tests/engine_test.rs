//! End-to-end tests for the `ContexEngine` façade (spec §8 scenarios E1-E3).
//! Requires a Postgres instance with the `vector` extension. Set
//! `DATABASE_TEST_URL` or these tests are skipped, matching every other
//! `contex-*` integration test's gating convention.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use contex_core::EngineConfig;
use contex_degradation::{DegradationController, DegradationMode};
use contex_dispatcher::{Dispatcher, DispatcherConfig, RetryConfig};
use contex_embedding::{EmbeddingProvider, EmbeddingResult, EmbeddingService};
use contex_engine::outbox::Outbox;
use contex_engine::{ContexEngine, DataFormat, EngineDeps, PublishRequest, RegisterRequest};
use contex_eventlog::EventLog;
use contex_matcher::SemanticMatcher;
use contex_registry::Registry;
use contex_vectorindex::VectorIndex;

/// A deterministic, test-only embedding provider: hashes each distinctive
/// substring in a fixed vocabulary into a handful of dimensions so that
/// semantically related strings in these tests land close together under
/// cosine similarity, without depending on a real model.
struct VocabEmbeddingProvider {
    vocabulary: Vec<&'static str>,
}

impl VocabEmbeddingProvider {
    fn new() -> Self {
        Self {
            vocabulary: vec![
                "api", "config", "endpoint", "url", "database", "schema", "table", "column",
                "users", "billing", "invoice", "payment",
            ],
        }
    }
}

#[async_trait]
impl EmbeddingProvider for VocabEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let lowered = text.to_lowercase();
        let mut vector = vec![0.0f32; 384];
        for (i, term) in self.vocabulary.iter().enumerate() {
            if lowered.contains(term) {
                vector[i] = 1.0;
            }
        }
        // A stable low-amplitude tail so unrelated strings aren't identical zero vectors.
        vector[380] = (lowered.len() % 7) as f32 * 0.01;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut out = Vec::new();
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn model_version(&self) -> &str {
        "vocab-test-v1"
    }
}

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(&pool).await.ok()?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            project_id TEXT NOT NULL, sequence BIGINT NOT NULL, event_type TEXT NOT NULL,
            payload JSONB NOT NULL, created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (project_id, sequence)
        )"#,
    )
    .execute(&pool)
    .await
    .ok()?;
    sqlx::query("CREATE TABLE IF NOT EXISTS project_sequences (project_id TEXT PRIMARY KEY, next_seq BIGINT NOT NULL DEFAULT 1)")
        .execute(&pool)
        .await
        .ok()?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS context_nodes (
            project_id TEXT NOT NULL, node_key TEXT NOT NULL, data_key TEXT NOT NULL,
            description TEXT NOT NULL, payload JSONB NOT NULL, embedding vector(384) NOT NULL,
            content_hash TEXT NOT NULL, created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (project_id, node_key)
        )"#,
    )
    .execute(&pool)
    .await
    .ok()?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agent_registrations (
            agent_id TEXT PRIMARY KEY, project_id TEXT NOT NULL, needs JSONB NOT NULL,
            delivery_mode TEXT NOT NULL, delivery_target JSONB NOT NULL,
            last_seen_sequence BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(), last_active_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(&pool)
    .await
    .ok()?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_circuit_state (
            destination_url TEXT PRIMARY KEY, state TEXT NOT NULL DEFAULT 'closed',
            consecutive_failures INTEGER NOT NULL DEFAULT 0, opened_at TIMESTAMPTZ,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    )
    .execute(&pool)
    .await
    .ok()?;

    sqlx::query("TRUNCATE events, project_sequences, context_nodes, agent_registrations, webhook_circuit_state")
        .execute(&pool)
        .await
        .ok()?;

    Some(pool)
}

async fn build_engine(pool: PgPool) -> ContexEngine {
    build_engine_with_config(pool, EngineConfig::default()).await
}

async fn build_engine_with_config(pool: PgPool, config: EngineConfig) -> ContexEngine {
    build_engine_with_deps(pool, config, Arc::new(DegradationController::new())).await.0
}

/// Like `build_engine_with_config`, but also hands back the `Outbox` and
/// lets the caller supply its own `DegradationController` (so a test can
/// force it into `Degraded` before publishing).
async fn build_engine_with_deps(
    pool: PgPool,
    config: EngineConfig,
    degradation: Arc<DegradationController>,
) -> (ContexEngine, Arc<Outbox>) {
    let event_log = EventLog::new(pool.clone());
    let vector_index = Arc::new(VectorIndex::new(pool.clone()));
    let embedding = Arc::new(EmbeddingService::new(Arc::new(VocabEmbeddingProvider::new()), 1000, None));
    let matcher = Arc::new(SemanticMatcher::new(embedding.clone(), vector_index.clone(), None));
    let registry = Registry::new(pool.clone());
    let dispatcher = Arc::new(
        Dispatcher::new(
            pool.clone(),
            registry.clone(),
            matcher.clone(),
            DispatcherConfig {
                queue_capacity: 100,
                retry: RetryConfig::default(),
                circuit_failure_threshold: 5,
                circuit_cooldown: Duration::from_secs(60),
            },
        )
        .await
        .unwrap(),
    );

    let outbox = Arc::new(Outbox::new());
    let deps = EngineDeps {
        pool,
        event_log,
        vector_index,
        matcher,
        registry,
        dispatcher,
        embedding,
        degradation,
        outbox: outbox.clone(),
        config,
    };

    (ContexEngine::new(deps), outbox)
}

fn publish_json(project_id: &str, data_key: &str, data: serde_json::Value) -> PublishRequest {
    PublishRequest {
        project_id: project_id.to_string(),
        data_key: data_key.to_string(),
        raw_data: data.to_string(),
        data_format: DataFormat::Json,
        description: None,
        cancel: CancellationToken::new(),
    }
}

#[tokio::test]
async fn e1_publish_then_query_finds_the_matching_node() {
    let Some(pool) = test_pool().await else { return };
    let engine = build_engine(pool).await;

    let outcome = engine
        .publish(publish_json(
            "p1",
            "api_config",
            serde_json::json!({"base_url": "https://api.example.com", "timeout": 30}),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.sequence, 1);
    assert_eq!(outcome.node_keys, vec!["api_config".to_string()]);

    let results = engine
        .query("p1", &["API configuration and endpoints".to_string()], 3, 0.5, false, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_empty(), "expected at least one match above threshold");
    assert_eq!(results[0][0].node_key, "api_config");
    assert!(results[0][0].similarity >= 0.5);
}

#[tokio::test]
async fn e3_initial_snapshot_catches_up_on_prior_publishes() {
    let Some(pool) = test_pool().await else { return };
    let engine = build_engine(pool).await;

    engine
        .publish(publish_json("p1", "users_table", serde_json::json!({"columns": ["id", "email"]})))
        .await
        .unwrap();
    engine
        .publish(publish_json("p1", "billing_table", serde_json::json!({"columns": ["invoice_id", "amount"]})))
        .await
        .unwrap();

    let outcome = engine
        .register(RegisterRequest {
            agent_id: "g1".to_string(),
            project_id: "p1".to_string(),
            needs: vec!["database schema and tables".to_string(), "billing invoices".to_string()],
            delivery: contex_core::types::DeliveryTarget::Pubsub { channel: String::new() },
            since: Some(0),
            cancel: CancellationToken::new(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.registration.last_seen_sequence, 0);
    assert!(outcome.matched_needs_count >= 1);
}

#[tokio::test]
async fn e2_registered_agent_receives_a_live_update_over_pubsub() {
    let Some(pool) = test_pool().await else { return };
    let engine = build_engine(pool).await;

    engine
        .register(RegisterRequest {
            agent_id: "g1".to_string(),
            project_id: "p1".to_string(),
            needs: vec!["database schema and tables".to_string()],
            delivery: contex_core::types::DeliveryTarget::Pubsub { channel: String::new() },
            since: None,
            cancel: CancellationToken::new(),
        })
        .await
        .unwrap();

    let mut rx = engine.pubsub_receiver("g1");

    engine
        .publish(publish_json("p1", "users_table", serde_json::json!({"columns": ["id", "email"]})))
        .await
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(message.data_key, "users_table");
    assert_eq!(message.sequence, 1);
}

#[tokio::test]
async fn republishing_byte_identical_data_appends_an_event_but_does_not_redispatch() {
    let Some(pool) = test_pool().await else { return };
    let engine = build_engine(pool).await;

    let data = serde_json::json!({"columns": ["id", "email"]});
    let first = engine.publish(publish_json("p1", "users_table", data.clone())).await.unwrap();
    assert!(!first.deduplicated);

    let second = engine.publish(publish_json("p1", "users_table", data)).await.unwrap();
    assert_eq!(second.sequence, 2, "the event log still gets a new entry");
    assert!(second.deduplicated, "identical payload should be detected as unchanged");

    let nodes = engine.deps().vector_index.list("p1").await.unwrap();
    assert_eq!(nodes.len(), 1, "republishing the same node_key never creates a duplicate");
}

#[tokio::test]
async fn oversized_publish_decomposes_into_multiple_nodes() {
    let Some(pool) = test_pool().await else { return };
    let config = EngineConfig { max_context_size: 40, ..EngineConfig::default() };
    let engine = build_engine_with_config(pool, config).await;

    let data = serde_json::json!({
        "alpha": "x".repeat(100),
        "beta": "y".repeat(100),
    });
    let outcome = engine.publish(publish_json("p1", "big", data)).await.unwrap();

    assert_eq!(outcome.node_keys.len(), 2);
    assert!(outcome.node_keys.contains(&"big#/alpha".to_string()));
    assert!(outcome.node_keys.contains(&"big#/beta".to_string()));
}

#[tokio::test]
async fn publish_still_succeeds_and_defers_to_the_outbox_under_degraded() {
    let Some(pool) = test_pool().await else { return };

    let degradation = Arc::new(DegradationController::new());
    for _ in 0..3 {
        degradation.record_vector_index(false);
    }
    assert_eq!(degradation.mode(), DegradationMode::Degraded);

    let (engine, outbox) = build_engine_with_deps(pool, EngineConfig::default(), degradation).await;

    // spec §4.8: "publishes still succeed (log is authoritative), but
    // dispatch is deferred" — this must hold even though the dedup check
    // that used to run unconditionally before the log append also reads
    // the (degraded) vector index.
    let outcome = engine
        .publish(publish_json("p1", "api_config", serde_json::json!({"base_url": "https://api.example.com"})))
        .await
        .unwrap();

    assert_eq!(outcome.sequence, 1, "log append succeeds regardless of index health");
    assert!(!outcome.deduplicated, "dedup is not computed while degraded");
    assert_eq!(outbox.len(), 1, "index projection and dispatch are deferred to the outbox");

    let nodes = engine.deps().vector_index.list("p1").await.unwrap();
    assert!(nodes.is_empty(), "the vector index is never written to while degraded");
}

#[tokio::test]
async fn top_k_zero_returns_empty_no_error() {
    let Some(pool) = test_pool().await else { return };
    let engine = build_engine(pool).await;

    engine
        .publish(publish_json("p1", "api_config", serde_json::json!({"base_url": "https://api.example.com"})))
        .await
        .unwrap();

    let results = engine.query("p1", &["API configuration".to_string()], 0, 0.5, false, &CancellationToken::new()).await.unwrap();
    assert_eq!(results[0].len(), 0);
}
