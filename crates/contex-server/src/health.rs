//! `HealthCheck` adapters wiring real dependencies into the degradation
//! probe loop (spec §4.8). Each one does the cheapest possible check: a
//! round-trip, not a deep correctness test.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use contex_degradation::HealthCheck;
use contex_embedding::EmbeddingService;

pub struct PgHealthCheck {
    pool: PgPool,
}

impl PgHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PgHealthCheck {
    async fn check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// The vector index lives in the same database as the event log, but is
/// probed against its own surface (the `embedding` column and the
/// `vector` extension it depends on) rather than a bare `SELECT 1` —
/// sharing `PgHealthCheck`'s query with the event log would make the
/// two signals flip in lockstep on any outage, collapsing the
/// `Degraded` mode the degradation controller otherwise distinguishes
/// from `Unavailable` (spec §4.8).
pub struct VectorIndexHealthCheck {
    pool: PgPool,
}

impl VectorIndexHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for VectorIndexHealthCheck {
    async fn check(&self) -> bool {
        sqlx::query("SELECT embedding FROM context_nodes LIMIT 1").execute(&self.pool).await.is_ok()
    }
}

/// The keyword index lives in the same database as everything else, but is
/// probed separately (spec §4.3: optional, never drags the service below
/// `Degraded` on its own) by checking the FTS column it depends on exists.
pub struct KeywordIndexHealthCheck {
    pool: PgPool,
}

impl KeywordIndexHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for KeywordIndexHealthCheck {
    async fn check(&self) -> bool {
        sqlx::query("SELECT search_vector FROM context_nodes LIMIT 1").execute(&self.pool).await.is_ok()
    }
}

pub struct EmbeddingHealthCheck {
    embedding: Arc<EmbeddingService>,
}

impl EmbeddingHealthCheck {
    pub fn new(embedding: Arc<EmbeddingService>) -> Self {
        Self { embedding }
    }
}

#[async_trait]
impl HealthCheck for EmbeddingHealthCheck {
    async fn check(&self) -> bool {
        let probe = self.embedding.encode("healthcheck");
        matches!(tokio::time::timeout(Duration::from_secs(5), probe).await, Ok(Ok(_)))
    }
}

/// The pub/sub broker is an in-process channel registry; it has no external
/// dependency to fail against, so it is always healthy.
pub struct PubsubHealthCheck;

#[async_trait]
impl HealthCheck for PubsubHealthCheck {
    async fn check(&self) -> bool {
        true
    }
}
