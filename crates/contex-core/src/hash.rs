//! SHA-256 content hashing, shared by the embedding cache key and the
//! `ContextNode` idempotence check. Mirrors the
//! `Sha256::new(); hasher.update(...); hex::encode(hasher.finalize())`
//! idiom used throughout the corpus for cache keys.

use sha2::{Digest, Sha256};

pub fn hex_sha256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash of a canonicalized JSON value — used for the `content_hash` field
/// that backs idempotent republish detection. Relies on `serde_json`'s
/// stable key ordering for `Value::Object` (a `BTreeMap` under the
/// `preserve_order` feature is NOT enabled here, so objects serialize in
/// insertion order; callers that need hash stability across differently
/// ordered inputs must sort keys before calling this).
pub fn hex_sha256_json(value: &serde_json::Value) -> String {
    hex_sha256(&value.to_string())
}
