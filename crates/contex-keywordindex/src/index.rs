//! Keyword Index (spec §4.4, optional): a Postgres full-text search
//! adapter, participating only when hybrid mode is enabled. Grounded on
//! `rootsignal-domains::search::hybrid`'s FTS CTE
//! (`websearch_to_tsquery`/`ts_rank`). Exposed behind a trait so the
//! matcher never branches on the backing engine.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{KeywordIndexError, KeywordIndexResult};

#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub node_key: String,
    pub data_key: String,
    pub payload: serde_json::Value,
    pub rank: f32,
}

#[async_trait]
pub trait KeywordIndex: Send + Sync {
    async fn bm25(&self, project_id: &str, query: &str, top_k: usize) -> KeywordIndexResult<Vec<KeywordHit>>;
}

pub struct PgKeywordIndex {
    pool: PgPool,
}

impl PgKeywordIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeywordIndex for PgKeywordIndex {
    async fn bm25(&self, project_id: &str, query: &str, top_k: usize) -> KeywordIndexResult<Vec<KeywordHit>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, serde_json::Value, f32)> = sqlx::query_as(
            r#"
            SELECT node_key, data_key, payload, ts_rank(search_vector, websearch_to_tsquery('english', $2)) AS rank
            FROM context_nodes
            WHERE project_id = $1
              AND search_vector @@ websearch_to_tsquery('english', $2)
            ORDER BY rank DESC, node_key ASC
            LIMIT $3
            "#,
        )
        .bind(project_id)
        .bind(query)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(KeywordIndexError::Backend)?;

        Ok(rows.into_iter().map(|(node_key, data_key, payload, rank)| KeywordHit { node_key, data_key, payload, rank }).collect())
    }
}
