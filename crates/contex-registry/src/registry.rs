//! Subscription Registry (spec §4.6): durable agent registrations.
//! Grounded on the upsert idiom shared across the teacher's domain models
//! (`ON CONFLICT ... DO UPDATE`) and, for the idle-expiry sweep, the
//! background-task shape used by `rootsignal-scout-supervisor`'s notify
//! workers.

use chrono::Utc;
use sqlx::PgPool;

use contex_core::types::{AgentRegistration, DeliveryTarget};

use crate::error::{RegistryError, RegistryResult};

pub struct RegisterRequest {
    pub agent_id: String,
    pub project_id: String,
    pub needs: Vec<String>,
    pub delivery: DeliveryTarget,
    /// `since` to reset `last_seen_sequence` to; `None` means "current
    /// project length" (spec §4.6 default).
    pub since: Option<i64>,
}

#[derive(Clone)]
pub struct Registry {
    pool: PgPool,
}

impl Registry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Re-registering an existing `agent_id` replaces the record
    /// atomically; `delivery` may be changed freely here because
    /// immutability (spec §3) only applies *between* registrations, not
    /// across an explicit re-register.
    pub async fn register(&self, req: RegisterRequest, current_project_length: i64) -> RegistryResult<AgentRegistration> {
        let last_seen_sequence = req.since.unwrap_or(current_project_length);
        let (mode, target) = encode_delivery(&req.delivery);
        let needs = serde_json::to_value(&req.needs).expect("Vec<String> always serializes");

        let row: Row = sqlx::query_as(
            r#"
            INSERT INTO agent_registrations
                (agent_id, project_id, needs, delivery_mode, delivery_target, last_seen_sequence, created_at, last_active_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (agent_id) DO UPDATE SET
                project_id         = EXCLUDED.project_id,
                needs              = EXCLUDED.needs,
                delivery_mode      = EXCLUDED.delivery_mode,
                delivery_target    = EXCLUDED.delivery_target,
                last_seen_sequence = EXCLUDED.last_seen_sequence,
                last_active_at     = now()
            RETURNING agent_id, project_id, needs, delivery_mode, delivery_target, last_seen_sequence, created_at
            "#,
        )
        .bind(&req.agent_id)
        .bind(&req.project_id)
        .bind(&needs)
        .bind(mode)
        .bind(&target)
        .bind(last_seen_sequence)
        .fetch_one(&self.pool)
        .await
        .map_err(RegistryError::Backend)?;

        row.into_registration()
    }

    pub async fn unregister(&self, agent_id: &str) -> RegistryResult<()> {
        sqlx::query("DELETE FROM agent_registrations WHERE agent_id = $1")
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(RegistryError::Backend)?;
        Ok(())
    }

    pub async fn get(&self, agent_id: &str) -> RegistryResult<AgentRegistration> {
        let row: Option<Row> = sqlx::query_as(
            "SELECT agent_id, project_id, needs, delivery_mode, delivery_target, last_seen_sequence, created_at
             FROM agent_registrations WHERE agent_id = $1",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RegistryError::Backend)?;

        match row {
            Some(row) => row.into_registration(),
            None => Err(RegistryError::NotFound(agent_id.to_string())),
        }
    }

    pub async fn list(&self, project_id: Option<&str>) -> RegistryResult<Vec<AgentRegistration>> {
        let rows: Vec<Row> = match project_id {
            Some(project_id) => sqlx::query_as(
                "SELECT agent_id, project_id, needs, delivery_mode, delivery_target, last_seen_sequence, created_at
                 FROM agent_registrations WHERE project_id = $1 ORDER BY agent_id",
            )
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(RegistryError::Backend)?,
            None => sqlx::query_as(
                "SELECT agent_id, project_id, needs, delivery_mode, delivery_target, last_seen_sequence, created_at
                 FROM agent_registrations ORDER BY agent_id",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(RegistryError::Backend)?,
        };

        rows.into_iter().map(Row::into_registration).collect()
    }

    /// Advance `last_seen_sequence` after an acknowledged delivery (spec
    /// §4.5: "advances last_seen_sequence only on acknowledged delivery").
    pub async fn advance_last_seen(&self, agent_id: &str, sequence: i64) -> RegistryResult<()> {
        sqlx::query(
            "UPDATE agent_registrations SET last_seen_sequence = $2, last_active_at = now()
             WHERE agent_id = $1 AND last_seen_sequence < $2",
        )
        .bind(agent_id)
        .bind(sequence)
        .execute(&self.pool)
        .await
        .map_err(RegistryError::Backend)?;
        Ok(())
    }

    /// Remove registrations idle longer than `idle_expiry` (spec §4.6).
    /// Returns how many were expired.
    pub async fn expire_idle(&self, idle_expiry: std::time::Duration) -> RegistryResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::from_std(idle_expiry).unwrap_or(chrono::Duration::zero());
        let result = sqlx::query("DELETE FROM agent_registrations WHERE last_active_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(RegistryError::Backend)?;
        Ok(result.rows_affected())
    }
}

fn encode_delivery(delivery: &DeliveryTarget) -> (&'static str, serde_json::Value) {
    match delivery {
        DeliveryTarget::Pubsub { .. } => ("pubsub", serde_json::to_value(delivery).expect("serializable")),
        DeliveryTarget::Webhook { .. } => ("webhook", serde_json::to_value(delivery).expect("serializable")),
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    agent_id: String,
    project_id: String,
    needs: serde_json::Value,
    #[allow(dead_code)]
    delivery_mode: String,
    delivery_target: serde_json::Value,
    last_seen_sequence: i64,
    created_at: chrono::DateTime<Utc>,
}

impl Row {
    fn into_registration(self) -> RegistryResult<AgentRegistration> {
        let needs: Vec<String> = serde_json::from_value(self.needs)
            .map_err(|e| RegistryError::Backend(sqlx::Error::Decode(Box::new(e))))?;
        let delivery: DeliveryTarget = serde_json::from_value(self.delivery_target)
            .map_err(|e| RegistryError::Backend(sqlx::Error::Decode(Box::new(e))))?;

        Ok(AgentRegistration {
            agent_id: self.agent_id,
            project_id: self.project_id,
            needs,
            delivery,
            last_seen_sequence: self.last_seen_sequence,
            created_at: self.created_at,
        })
    }
}
