//! Two-tier cache wrapping an `EmbeddingProvider`: an in-process LRU for
//! hot-path hits (grounded on `ufp_semantic::cache`'s `lru::LruCache`
//! idiom, adapted from thread-local to a `parking_lot::Mutex` since this
//! cache is shared across the tokio runtime's worker threads) backed by a
//! Postgres table for cross-process reuse and warm restarts (grounded on
//! `rootsignal-graph::embedding_store::EmbeddingStore`).

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use sqlx::PgPool;

use contex_core::hash::hex_sha256;

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::provider::EmbeddingProvider;

pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    memory: Mutex<LruCache<String, Vec<f32>>>,
    pool: Option<PgPool>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache_size: usize, pool: Option<PgPool>) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).expect("cache_size is at least 1");
        Self { provider, memory: Mutex::new(LruCache::new(capacity)), pool }
    }

    fn cache_key(&self, text: &str) -> String {
        hex_sha256(&format!("{}\0{}", self.provider.model_version(), text))
    }

    pub async fn encode(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let key = self.cache_key(text);

        if let Some(hit) = self.memory.lock().get(&key).cloned() {
            metrics::counter!("embedding_cache_hit_total").increment(1);
            return Ok(hit);
        }

        if let Some(pool) = &self.pool {
            let row: Option<(Vec<f32>,)> =
                sqlx::query_as("SELECT embedding FROM embedding_cache WHERE input_hash = $1")
                    .bind(&key)
                    .fetch_optional(pool)
                    .await
                    .map_err(EmbeddingError::Cache)?;

            if let Some((embedding,)) = row {
                metrics::counter!("embedding_cache_hit_total").increment(1);
                self.memory.lock().put(key, embedding.clone());
                return Ok(embedding);
            }
        }

        metrics::counter!("embedding_cache_miss_total").increment(1);
        let started = std::time::Instant::now();
        let embedding = self.provider.embed(text).await?;
        metrics::histogram!("embedding_encode_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO embedding_cache (input_hash, model_version, embedding)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (input_hash) DO NOTHING",
            )
            .bind(&key)
            .bind(self.provider.model_version())
            .bind(&embedding)
            .execute(pool)
            .await
            .map_err(EmbeddingError::Cache)?;
        }

        self.memory.lock().put(key, embedding.clone());
        Ok(embedding)
    }

    /// Pre-warm the cache for a batch of texts in a single provider call.
    /// Skips texts already present in either tier. Returns the number of
    /// embeddings newly computed.
    pub async fn warm(&self, texts: &[String]) -> EmbeddingResult<usize> {
        let mut missing = Vec::new();
        for text in texts {
            let key = self.cache_key(text);
            if self.memory.lock().contains(&key) {
                continue;
            }
            if let Some(pool) = &self.pool {
                let row: Option<(String,)> =
                    sqlx::query_as("SELECT input_hash FROM embedding_cache WHERE input_hash = $1")
                        .bind(&key)
                        .fetch_optional(pool)
                        .await
                        .map_err(EmbeddingError::Cache)?;
                if row.is_some() {
                    continue;
                }
            }
            missing.push((key, text.clone()));
        }

        if missing.is_empty() {
            return Ok(0);
        }

        let texts_to_embed: Vec<String> = missing.iter().map(|(_, t)| t.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts_to_embed).await?;

        for ((key, _), embedding) in missing.iter().zip(embeddings.iter()) {
            if let Some(pool) = &self.pool {
                sqlx::query(
                    "INSERT INTO embedding_cache (input_hash, model_version, embedding)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (input_hash) DO NOTHING",
                )
                .bind(key)
                .bind(self.provider.model_version())
                .bind(embedding)
                .execute(pool)
                .await
                .map_err(EmbeddingError::Cache)?;
            }
            self.memory.lock().put(key.clone(), embedding.clone());
        }

        tracing::debug!(count = missing.len(), "warmed embedding cache");
        Ok(missing.len())
    }
}
