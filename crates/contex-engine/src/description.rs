//! Description composition (spec §4.7 step 3): `data_key + " " +
//! first-N tokens of normalized text` when the caller doesn't supply one.

use contex_core::NormalizedValue;
use serde_json::Value;

const DEFAULT_SUMMARY_TOKENS: usize = 40;

/// Text used as the embedding/description basis for a value — its JSON
/// string form for scalars, and its unquoted content for strings (so
/// a published string doesn't get embedded with literal quote characters).
/// Routed through `NormalizedValue` (spec §9: "downstream code pattern-
/// matches [the tagged variant] and never inspects runtime types").
pub fn text_summary(value: &Value) -> String {
    NormalizedValue::from_json(value.clone()).as_text_summary()
}

/// `data_key + " " + first N whitespace-delimited tokens` of `text`.
pub fn default_description(key: &str, text: &str) -> String {
    let summary: Vec<&str> = text.split_whitespace().take(DEFAULT_SUMMARY_TOKENS).collect();
    format!("{key} {}", summary.join(" "))
}
