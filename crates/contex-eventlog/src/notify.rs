//! Best-effort `pg_notify` wakeup for the dispatcher, grounded on
//! `rootsignal-events::store::notify_new_event`: "a nudge, not a delivery
//! guarantee." The dispatcher's correctness never depends on receiving
//! this notification — it falls back to polling `EventLog::read`.

use sqlx::PgPool;

pub async fn notify_new_event(pool: &PgPool, project_id: &str, sequence: i64) {
    let result = sqlx::query("SELECT pg_notify('contex_events', $1::text)")
        .bind(format!("{project_id}:{sequence}"))
        .execute(pool)
        .await;

    if let Err(e) = result {
        tracing::warn!(error = %e, project_id, sequence, "pg_notify failed (non-fatal)");
    }
}
