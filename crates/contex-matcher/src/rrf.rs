//! Reciprocal Rank Fusion, grounded on `rootsignal-domains::search::hybrid`'s
//! `(1.0 / (60 + sem_rn)) + (1.0 / (60 + fts_rn))` formula — here applied
//! to two already-ranked Rust-side result lists rather than a single SQL
//! `FULL OUTER JOIN`, since the vector and keyword indexes are independent
//! adapters behind separate trait boundaries.

use std::collections::HashMap;

use contex_keywordindex::KeywordHit;
use contex_vectorindex::SearchHit;

pub const K_RRF: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct FusedHit {
    pub node_key: String,
    pub data_key: String,
    pub payload: serde_json::Value,
    pub similarity: f32,
    pub fused_score: f64,
}

/// Fuse semantic and keyword result lists, keeping the union of both
/// (spec.md §4.4: "keep the union, compute `fused_score`") the same way
/// the grounding CTE's `FULL OUTER JOIN sem ... fts` does. A node present
/// in only one list still gets a `FusedHit`: its missing side's RRF term
/// is `0.0`, and its `similarity` falls back to `0.0` when it has no
/// semantic hit to source one from (it was never scored against the
/// query embedding, so there is nothing to re-apply `threshold` to other
/// than an absence — the caller's post-fuse threshold filter then excludes
/// it unless `threshold <= 0.0`).
pub fn fuse(sem: &[SearchHit], kw: &[KeywordHit], w_sem: f64, w_kw: f64) -> Vec<FusedHit> {
    let sem_rank: HashMap<&str, usize> =
        sem.iter().enumerate().map(|(i, h)| (h.node_key.as_str(), i + 1)).collect();
    let kw_rank: HashMap<&str, usize> =
        kw.iter().enumerate().map(|(i, h)| (h.node_key.as_str(), i + 1)).collect();
    let sem_by_key: HashMap<&str, &SearchHit> = sem.iter().map(|h| (h.node_key.as_str(), h)).collect();
    let kw_by_key: HashMap<&str, &KeywordHit> = kw.iter().map(|h| (h.node_key.as_str(), h)).collect();

    let mut keys: Vec<&str> = sem.iter().map(|h| h.node_key.as_str()).collect();
    for hit in kw {
        if !sem_by_key.contains_key(hit.node_key.as_str()) {
            keys.push(hit.node_key.as_str());
        }
    }

    let mut fused: Vec<FusedHit> = keys
        .into_iter()
        .map(|key| {
            let sem_term = rrf_term(sem_rank.get(key));
            let kw_term = rrf_term(kw_rank.get(key));
            let (data_key, payload, similarity) = match sem_by_key.get(key) {
                Some(hit) => (hit.data_key.clone(), hit.payload.clone(), hit.similarity),
                None => {
                    let hit = kw_by_key[key];
                    (hit.data_key.clone(), hit.payload.clone(), 0.0)
                }
            };
            FusedHit {
                node_key: key.to_string(),
                data_key,
                payload,
                similarity,
                fused_score: w_sem * sem_term + w_kw * kw_term,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.node_key.cmp(&b.node_key))
    });

    fused
}

fn rrf_term(rank: Option<&usize>) -> f64 {
    match rank {
        Some(r) => 1.0 / (K_RRF + *r as f64),
        None => 0.0,
    }
}
