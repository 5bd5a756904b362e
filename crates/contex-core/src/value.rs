//! Tagged representation of published data (spec §9: "dynamic payloads →
//! tagged variants"). Incoming `data` arrives as an opaque JSON value;
//! normalization classifies it once at ingress so downstream code never
//! inspects `serde_json::Value` variants directly.

use serde_json::Value;

/// A normalized view of a published record's content.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Scalar(Value),
    String(String),
    Object(serde_json::Map<String, Value>),
    Array(Vec<Value>),
}

impl NormalizedValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Object(map) => Self::Object(map),
            Value::Array(items) => Self::Array(items),
            scalar => Self::Scalar(scalar),
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::Scalar(v) => v,
            Self::String(s) => Value::String(s),
            Self::Object(map) => Value::Object(map),
            Self::Array(items) => Value::Array(items),
        }
    }

    /// Text used as the basis for `description` composition and, absent an
    /// explicit description, for embedding.
    pub fn as_text_summary(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            other => other.clone().into_json().to_string(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_))
    }
}
