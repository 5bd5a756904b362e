//! Semantic Matcher (spec §4.4): composes the Embedding Service, Vector
//! Index, and optional Keyword Index. Grounded on
//! `rootsignal-domains::search::hybrid::hybrid_search`'s dispatch between
//! a fused and a vector-only path, and on `bravo1goingdark-ucfp`'s
//! convention of keeping the algorithm crate-agnostic of which concrete
//! index adapters it's given (index access only through their traits).

use std::sync::Arc;

use contex_core::types::Match;
use contex_embedding::EmbeddingService;
use contex_keywordindex::KeywordIndex;
use contex_vectorindex::VectorIndex;

use crate::rrf::fuse;

pub struct MatcherConfig {
    pub w_sem: f64,
    pub w_kw: f64,
}

pub struct SemanticMatcher {
    embedding: Arc<EmbeddingService>,
    vectors: Arc<VectorIndex>,
    keywords: Option<Arc<dyn KeywordIndex>>,
}

/// Per-need match results for one `query` call (spec §4.4: "preserves
/// per-need grouping").
pub struct QueryResult {
    pub per_query: Vec<Vec<Match>>,
}

impl SemanticMatcher {
    pub fn new(
        embedding: Arc<EmbeddingService>,
        vectors: Arc<VectorIndex>,
        keywords: Option<Arc<dyn KeywordIndex>>,
    ) -> Self {
        Self { embedding, vectors, keywords }
    }

    pub async fn query(
        &self,
        project_id: &str,
        queries: &[String],
        top_k: usize,
        threshold: f32,
        hybrid: bool,
        config: &MatcherConfig,
    ) -> contex_core::ContexResult<QueryResult> {
        let mut per_query = Vec::with_capacity(queries.len());

        for (need_index, query) in queries.iter().enumerate() {
            let matches = self
                .match_one(project_id, query, need_index, top_k, threshold, hybrid, config)
                .await?;
            per_query.push(matches);
        }

        Ok(QueryResult { per_query })
    }

    async fn match_one(
        &self,
        project_id: &str,
        query: &str,
        need_index: usize,
        top_k: usize,
        threshold: f32,
        hybrid: bool,
        config: &MatcherConfig,
    ) -> contex_core::ContexResult<Vec<Match>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedding.encode(query).await?;
        let sem_hits = self.vectors.search(project_id, &embedding, top_k * 2, threshold).await?;

        let fused = if hybrid {
            if let Some(keywords) = &self.keywords {
                let kw_hits = keywords.bm25(project_id, query, top_k * 2).await?;
                fuse(&sem_hits, &kw_hits, config.w_sem, config.w_kw)
            } else {
                fuse(&sem_hits, &[], config.w_sem, config.w_kw)
            }
        } else {
            fuse(&sem_hits, &[], 1.0, 0.0)
        };

        let matches = fused
            .into_iter()
            .filter(|hit| hit.similarity >= threshold)
            .take(top_k)
            .map(|hit| Match {
                node_key: hit.node_key,
                data_key: hit.data_key,
                payload: hit.payload,
                similarity: hit.similarity,
                need_index,
            })
            .collect();

        Ok(matches)
    }

    /// Restricted match against a single node's embedding, used by the
    /// dispatcher's fan-out algorithm (spec §4.5 step 2): "direct cosine
    /// over encode(need) x encode(d)", not a full index search.
    pub async fn interested(&self, need: &str, node_embedding: &[f32], threshold: f32) -> contex_core::ContexResult<bool> {
        let need_embedding = self.embedding.encode(need).await?;
        Ok(cosine_similarity(&need_embedding, node_embedding) >= threshold)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
