//! Wire and domain types shared across `contex-*` crates. Mirrors
//! `rootsignal-events::types`'s split between a stored record
//! (`StoredEvent`) and the data a caller builds before it is assigned a
//! sequence (`AppendEvent`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four event types a project's log can contain (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DataPublished,
    AgentRegistered,
    AgentUnregistered,
    DataDeleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataPublished => "data_published",
            Self::AgentRegistered => "agent_registered",
            Self::AgentUnregistered => "agent_unregistered",
            Self::DataDeleted => "data_deleted",
        }
    }
}

/// An event as stored in the log. Returned by every read operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub project_id: String,
    pub sequence: i64,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An event the caller wants appended; the log assigns `sequence`.
#[derive(Debug, Clone)]
pub struct AppendEvent {
    pub project_id: String,
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

impl AppendEvent {
    pub fn new(project_id: impl Into<String>, event_type: EventType, payload: serde_json::Value) -> Self {
        Self { project_id: project_id.into(), event_type, payload }
    }
}

/// The `data_published` event payload (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPublishedPayload {
    pub data_key: String,
    pub node_keys: Vec<String>,
    pub data: serde_json::Value,
}

/// A materialized, embeddable unit of published data (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextNode {
    pub project_id: String,
    pub data_key: String,
    pub node_key: String,
    pub description: String,
    pub payload: serde_json::Value,
    pub embedding: Vec<f32>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A ranked match produced by the semantic matcher (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub node_key: String,
    pub data_key: String,
    pub payload: serde_json::Value,
    pub similarity: f32,
    pub need_index: usize,
}

/// Delivery mode an agent registration carries. `delivery` is immutable
/// after registration (spec §3) — changing it requires re-registering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryTarget {
    Pubsub { channel: String },
    Webhook { url: String, hmac_secret: Option<String> },
}

impl DeliveryTarget {
    pub fn pubsub_channel(agent_id: &str) -> String {
        format!("agent:{agent_id}:updates")
    }
}

/// A durable agent registration (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: String,
    pub project_id: String,
    pub needs: Vec<String>,
    pub delivery: DeliveryTarget,
    pub last_seen_sequence: i64,
    pub created_at: DateTime<Utc>,
}

/// The outbound message shape for both pub/sub and webhook delivery (spec
/// §6: "message bodies identical to webhook bodies").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMessage {
    #[serde(rename = "type")]
    pub message_type: UpdateMessageType,
    pub project_id: String,
    pub agent_id: String,
    pub sequence: i64,
    pub data_key: String,
    pub node_key: String,
    pub data: serde_json::Value,
    pub matched_need: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMessageType {
    DataUpdate,
    InitialContext,
}
