//! Durable backing for `CircuitBreakerManager` (spec: CircuitState survives
//! a dispatcher restart). Loaded once at startup and upserted on every
//! transition; a missed write just means one extra cold-start probe next
//! time, never a correctness problem.

use sqlx::PgPool;

use crate::circuit::{CircuitBreakerManager, CircuitState};
use crate::error::DispatcherResult;

pub async fn load(pool: &PgPool, manager: &CircuitBreakerManager) -> DispatcherResult<()> {
    let rows: Vec<(String, String, i32)> =
        sqlx::query_as("SELECT destination_url, state, consecutive_failures FROM webhook_circuit_state")
            .fetch_all(pool)
            .await?;

    for (url, state, failures) in rows {
        manager.restore_one(&url, CircuitState::parse(&state), failures.max(0) as u32);
    }
    Ok(())
}

pub async fn persist(pool: &PgPool, url: &str, state: CircuitState, consecutive_failures: u32) -> DispatcherResult<()> {
    let opened_at = matches!(state, CircuitState::Open).then(chrono::Utc::now);
    sqlx::query(
        r#"
        INSERT INTO webhook_circuit_state (destination_url, state, consecutive_failures, opened_at, updated_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (destination_url) DO UPDATE SET
            state = EXCLUDED.state,
            consecutive_failures = EXCLUDED.consecutive_failures,
            opened_at = COALESCE(EXCLUDED.opened_at, webhook_circuit_state.opened_at),
            updated_at = now()
        "#,
    )
    .bind(url)
    .bind(state.as_str())
    .bind(consecutive_failures as i32)
    .bind(opened_at)
    .execute(pool)
    .await?;
    Ok(())
}
