//! EventLog — append-only, per-project monotonically sequenced fact store
//! backed by Postgres.
//!
//! Unlike a bare `BIGSERIAL`, sequence allocation here goes through a
//! per-project counter row (`project_sequences`) incremented in the same
//! transaction as the insert, so a rolled-back append never burns a
//! sequence number — the spec requires a gap-free, contiguous suffix of
//! sequences per project (§8, invariant 1), stricter than the teacher's
//! single causal log, which tolerates `BIGSERIAL` gaps from rollbacks.
//! `read` keeps the teacher's defensive gap-stop loop anyway, since a
//! long-running transaction can still make a just-committed row appear out
//! of order to a concurrent reader.

use sqlx::PgPool;

use contex_core::types::{AppendEvent, EventType, StoredEvent};

use crate::error::{EventLogError, EventLogResult};

pub const MAX_READ_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct EventLog {
    pool: PgPool,
}

impl EventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Allocate the next sequence for `event.project_id` and append the
    /// event atomically. Durable before this returns (spec §4.2).
    pub async fn append(&self, event: AppendEvent) -> EventLogResult<i64> {
        let mut tx = self.pool.begin().await.map_err(EventLogError::Backend)?;

        let (seq,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO project_sequences (project_id, next_seq)
            VALUES ($1, 2)
            ON CONFLICT (project_id) DO UPDATE SET next_seq = project_sequences.next_seq + 1
            RETURNING next_seq - 1
            "#,
        )
        .bind(&event.project_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(EventLogError::Backend)?;

        sqlx::query(
            r#"
            INSERT INTO events (project_id, sequence, event_type, payload)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&event.project_id)
        .bind(seq)
        .bind(event.event_type.as_str())
        .bind(&event.payload)
        .execute(&mut *tx)
        .await
        .map_err(EventLogError::Backend)?;

        tx.commit().await.map_err(EventLogError::Backend)?;

        crate::notify::notify_new_event(&self.pool, &event.project_id, seq).await;

        Ok(seq)
    }

    /// Events with `sequence > since`, ascending, capped at `limit` (spec
    /// §4.2). Stops at the first gap so a reader never observes one.
    pub async fn read(&self, project_id: &str, since: i64, limit: i64) -> EventLogResult<Vec<StoredEvent>> {
        let limit = limit.clamp(0, MAX_READ_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT project_id, sequence, event_type, payload, created_at
            FROM events
            WHERE project_id = $1 AND sequence > $2
            ORDER BY sequence ASC
            LIMIT $3
            "#,
        )
        .bind(project_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(EventLogError::Backend)?;

        let mut result = Vec::with_capacity(rows.len());
        let mut expected = since + 1;

        for row in rows {
            if row.sequence != expected {
                break;
            }
            expected = row.sequence + 1;
            result.push(row.into_stored_event()?);
        }

        Ok(result)
    }

    /// Current max sequence for a project, or 0 if none appended yet.
    pub async fn length(&self, project_id: &str) -> EventLogResult<i64> {
        let (max,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(sequence) FROM events WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(&self.pool)
                .await
                .map_err(EventLogError::Backend)?;

        Ok(max.unwrap_or(0))
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    project_id: String,
    sequence: i64,
    event_type: String,
    payload: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl EventRow {
    fn into_stored_event(self) -> EventLogResult<StoredEvent> {
        let event_type = parse_event_type(&self.event_type)?;
        Ok(StoredEvent {
            project_id: self.project_id,
            sequence: self.sequence,
            event_type,
            payload: self.payload,
            created_at: self.created_at,
        })
    }
}

fn parse_event_type(s: &str) -> EventLogResult<EventType> {
    Ok(match s {
        "data_published" => EventType::DataPublished,
        "agent_registered" => EventType::AgentRegistered,
        "agent_unregistered" => EventType::AgentUnregistered,
        "data_deleted" => EventType::DataDeleted,
        other => {
            return Err(EventLogError::Backend(sqlx::Error::Decode(
                format!("unknown event_type stored in log: {other}").into(),
            )))
        }
    })
}

#[cfg(feature = "test-utils")]
impl EventLog {
    /// Read every event for a project, ignoring the gap-stop guard. Tests
    /// only — used to assert what is actually on disk after deliberately
    /// simulating a gap.
    pub async fn read_all_unchecked(&self, project_id: &str) -> EventLogResult<Vec<StoredEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT project_id, sequence, event_type, payload, created_at
            FROM events
            WHERE project_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(EventLogError::Backend)?;

        rows.into_iter().map(EventRow::into_stored_event).collect()
    }
}
