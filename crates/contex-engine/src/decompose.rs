//! Node decomposition (spec §4.7 step 2, §9 "cyclic or deeply nested
//! records → decomposition"). A published record normalizes to one
//! `ContextNode` keyed by `data_key` when small enough; an object or array
//! whose serialized size exceeds `max_context_size` is split one level at
//! a time into `data_key#/json/pointer` children, recursively, until every
//! leaf is under the threshold or is a scalar (DESIGN.md's resolution of
//! the spec's open decomposition-boundary question).

use contex_core::NormalizedValue;
use serde_json::Value;

/// One decomposed unit: its node key and the JSON value it embeds.
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedNode {
    pub node_key: String,
    pub pointer: String,
    pub value: Value,
}

pub fn decompose(data_key: &str, value: &Value, max_context_size: usize) -> Vec<DecomposedNode> {
    let mut out = Vec::new();
    walk(data_key, "", value, max_context_size, &mut out);
    out
}

fn walk(data_key: &str, pointer: &str, value: &Value, max_context_size: usize, out: &mut Vec<DecomposedNode>) {
    let is_composite = NormalizedValue::from_json(value.clone()).is_composite();
    let serialized_len = value.to_string().len();

    if !is_composite || serialized_len <= max_context_size {
        let node_key = if pointer.is_empty() { data_key.to_string() } else { format!("{data_key}#{pointer}") };
        out.push(DecomposedNode { node_key, pointer: pointer.to_string(), value: value.clone() });
        return;
    }

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                walk(data_key, &format!("{pointer}/{key}"), child, max_context_size, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                walk(data_key, &format!("{pointer}/{i}"), child, max_context_size, out);
            }
        }
        // Empty object/array: nothing to recurse into, keep as a single leaf.
        _ => {
            let node_key = if pointer.is_empty() { data_key.to_string() } else { format!("{data_key}#{pointer}") };
            out.push(DecomposedNode { node_key, pointer: pointer.to_string(), value: value.clone() });
        }
    }
}
