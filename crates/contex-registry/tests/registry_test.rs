use std::time::Duration;

use contex_core::types::DeliveryTarget;
use contex_registry::{RegisterRequest, Registry};
use sqlx::PgPool;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.expect("connect to test database");
    sqlx::query(include_str!("../migrations/0001_agent_registrations.sql"))
        .execute(&pool)
        .await
        .expect("run migration");
    sqlx::query("TRUNCATE agent_registrations")
        .execute(&pool)
        .await
        .expect("truncate");
    Some(pool)
}

fn pubsub_req(agent_id: &str, project_id: &str, needs: &[&str]) -> RegisterRequest {
    RegisterRequest {
        agent_id: agent_id.to_string(),
        project_id: project_id.to_string(),
        needs: needs.iter().map(|s| s.to_string()).collect(),
        delivery: DeliveryTarget::Pubsub {
            channel: format!("agent:{agent_id}:updates"),
        },
        since: None,
    }
}

// Basic behavior tests

#[tokio::test]
async fn register_returns_the_stored_registration() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    let reg = registry
        .register(pubsub_req("agent-1", "proj-a", &["payments", "fraud"]), 42)
        .await
        .unwrap();

    assert_eq!(reg.agent_id, "agent-1");
    assert_eq!(reg.project_id, "proj-a");
    assert_eq!(reg.needs, vec!["payments".to_string(), "fraud".to_string()]);
    assert_eq!(reg.last_seen_sequence, 42);
}

#[tokio::test]
async fn get_returns_a_previously_registered_agent() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.register(pubsub_req("agent-1", "proj-a", &["x"]), 0).await.unwrap();
    let fetched = registry.get("agent-1").await.unwrap();

    assert_eq!(fetched.agent_id, "agent-1");
}

#[tokio::test]
async fn unregister_removes_the_record() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.register(pubsub_req("agent-1", "proj-a", &["x"]), 0).await.unwrap();
    registry.unregister("agent-1").await.unwrap();

    assert!(registry.get("agent-1").await.is_err());
}

#[tokio::test]
async fn list_filters_by_project() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.register(pubsub_req("agent-1", "proj-a", &["x"]), 0).await.unwrap();
    registry.register(pubsub_req("agent-2", "proj-a", &["y"]), 0).await.unwrap();
    registry.register(pubsub_req("agent-3", "proj-b", &["z"]), 0).await.unwrap();

    let proj_a = registry.list(Some("proj-a")).await.unwrap();
    assert_eq!(proj_a.len(), 2);

    let all = registry.list(None).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn reregistration_atomically_replaces_delivery_and_resets_last_seen_sequence() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.register(pubsub_req("agent-1", "proj-a", &["x"]), 10).await.unwrap();

    let mut second = pubsub_req("agent-1", "proj-a", &["x", "y"]);
    second.delivery = DeliveryTarget::Webhook {
        url: "https://example.com/hook".to_string(),
        hmac_secret: Some("s3cret".to_string()),
    };
    second.since = Some(0);
    registry.register(second, 99).await.unwrap();

    let fetched = registry.get("agent-1").await.unwrap();
    assert_eq!(fetched.needs, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(fetched.last_seen_sequence, 0);
    assert!(matches!(fetched.delivery, DeliveryTarget::Webhook { .. }));

    let remaining = registry.list(None).await.unwrap();
    assert_eq!(remaining.len(), 1, "re-registration must not create a duplicate row");
}

#[tokio::test]
async fn advance_last_seen_only_moves_forward() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.register(pubsub_req("agent-1", "proj-a", &["x"]), 5).await.unwrap();
    registry.advance_last_seen("agent-1", 20).await.unwrap();
    assert_eq!(registry.get("agent-1").await.unwrap().last_seen_sequence, 20);

    registry.advance_last_seen("agent-1", 3).await.unwrap();
    assert_eq!(
        registry.get("agent-1").await.unwrap().last_seen_sequence,
        20,
        "a stale sequence must never move last_seen_sequence backwards"
    );
}

// Adversarial tests — try to break the implementation

#[tokio::test]
async fn get_of_unknown_agent_is_not_found_not_a_panic() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    let err = registry.get("does-not-exist").await.unwrap_err();
    assert!(matches!(err, contex_registry::RegistryError::NotFound(_)));
}

#[tokio::test]
async fn unregister_of_unknown_agent_is_not_an_error() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.unregister("never-registered").await.unwrap();
}

#[tokio::test]
async fn expire_idle_only_removes_agents_past_the_cutoff() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    registry.register(pubsub_req("fresh", "proj-a", &["x"]), 0).await.unwrap();

    let expired = registry.expire_idle(Duration::from_secs(3600)).await.unwrap();
    assert_eq!(expired, 0, "an agent registered moments ago must not be swept with a 1h idle window");
    assert!(registry.get("fresh").await.is_ok());

    let expired = registry.expire_idle(Duration::from_secs(0)).await.unwrap();
    assert_eq!(expired, 1, "a zero-second idle window must sweep everything");
    assert!(registry.get("fresh").await.is_err());
}

#[tokio::test]
async fn empty_needs_list_is_accepted() {
    let Some(pool) = test_pool().await else { return };
    let registry = Registry::new(pool);

    let reg = registry.register(pubsub_req("agent-1", "proj-a", &[]), 0).await.unwrap();
    assert!(reg.needs.is_empty());
}
