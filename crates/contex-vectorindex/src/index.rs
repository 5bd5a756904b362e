//! Vector Index (spec §4.3): a pgvector adapter over `(project_id,
//! node_key) -> (embedding, description, payload)`. Grounded on
//! `rootsignal-domains::entities::models::embedding::Embedding` —
//! `ON CONFLICT DO UPDATE` for atomic upsert, `<=>` for cosine distance.
//! pgvector's `<=>` operator returns a *distance* (1 - cosine similarity),
//! so every reported similarity here is `1.0 - distance`, matching
//! `hybrid.rs`'s `(1.0 - sc.sem_distance) AS semantic_score` conversion.

use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::PgPool;

use contex_core::types::ContextNode;

use crate::error::{VectorIndexError, VectorIndexResult};

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub node_key: String,
    pub data_key: String,
    pub description: String,
    pub payload: serde_json::Value,
    pub similarity: f32,
}

#[derive(Clone)]
pub struct VectorIndex {
    pool: PgPool,
}

impl VectorIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, node: &ContextNode) -> VectorIndexResult<()> {
        let vector = Vector::from(node.embedding.clone());

        sqlx::query(
            r#"
            INSERT INTO context_nodes
                (project_id, node_key, data_key, description, payload, embedding, content_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (project_id, node_key) DO UPDATE SET
                data_key     = EXCLUDED.data_key,
                description  = EXCLUDED.description,
                payload      = EXCLUDED.payload,
                embedding    = EXCLUDED.embedding,
                content_hash = EXCLUDED.content_hash
            "#,
        )
        .bind(&node.project_id)
        .bind(&node.node_key)
        .bind(&node.data_key)
        .bind(&node.description)
        .bind(&node.payload)
        .bind(&vector)
        .bind(&node.content_hash)
        .bind(node.created_at)
        .execute(&self.pool)
        .await
        .map_err(VectorIndexError::Backend)?;

        Ok(())
    }

    pub async fn delete(&self, project_id: &str, node_key: &str) -> VectorIndexResult<()> {
        sqlx::query("DELETE FROM context_nodes WHERE project_id = $1 AND node_key = $2")
            .bind(project_id)
            .bind(node_key)
            .execute(&self.pool)
            .await
            .map_err(VectorIndexError::Backend)?;
        Ok(())
    }

    /// Cosine similarity top-K, descending, filtered by `similarity >=
    /// threshold`. Tie-broken by `node_key` ascending (spec §4.3) — the SQL
    /// `ORDER BY` already does this, but rows are re-sorted defensively
    /// after fetch since floating-point distance ties can land either side
    /// of the planner's chosen order.
    pub async fn search(
        &self,
        project_id: &str,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> VectorIndexResult<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = Vector::from(query_embedding.to_vec());
        let max_distance = 1.0 - threshold;

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT node_key, data_key, description, payload, (embedding <=> $1) AS distance
            FROM context_nodes
            WHERE project_id = $2 AND (embedding <=> $1) <= $3
            ORDER BY embedding <=> $1 ASC, node_key ASC
            LIMIT $4
            "#,
        )
        .bind(&vector)
        .bind(project_id)
        .bind(max_distance as f64)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(VectorIndexError::Backend)?;

        let mut hits: Vec<SearchHit> = rows
            .into_iter()
            .map(|r| SearchHit {
                node_key: r.node_key,
                data_key: r.data_key,
                description: r.description,
                payload: r.payload,
                similarity: (1.0 - r.distance) as f32,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_key.cmp(&b.node_key))
        });

        Ok(hits)
    }

    pub async fn list(&self, project_id: &str) -> VectorIndexResult<Vec<ContextNode>> {
        let rows: Vec<FullRow> = sqlx::query_as(
            r#"
            SELECT project_id, node_key, data_key, description, payload, embedding, content_hash, created_at
            FROM context_nodes
            WHERE project_id = $1
            ORDER BY node_key ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(VectorIndexError::Backend)?;

        Ok(rows.into_iter().map(FullRow::into_node).collect())
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    node_key: String,
    data_key: String,
    description: String,
    payload: serde_json::Value,
    distance: f64,
}

#[derive(sqlx::FromRow)]
struct FullRow {
    project_id: String,
    node_key: String,
    data_key: String,
    description: String,
    payload: serde_json::Value,
    embedding: Vector,
    content_hash: String,
    created_at: DateTime<Utc>,
}

impl FullRow {
    fn into_node(self) -> ContextNode {
        ContextNode {
            project_id: self.project_id,
            data_key: self.data_key,
            node_key: self.node_key,
            description: self.description,
            payload: self.payload,
            embedding: self.embedding.to_vec(),
            content_hash: self.content_hash,
            created_at: self.created_at,
        }
    }
}
