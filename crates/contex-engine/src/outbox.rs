//! In-memory outbox for deferred work under `DEGRADED` (spec §4.8:
//! "dispatch is deferred to an in-memory outbox drained on recovery").
//! Shape follows the bounded-`Mutex<VecDeque>` pattern used by the
//! dispatcher's own per-agent queue (`contex_dispatcher::queue::AgentQueue`),
//! generalized here to hold whole publish outcomes rather than individual
//! per-agent messages.

use std::collections::VecDeque;

use parking_lot::Mutex;

use contex_core::types::ContextNode;

/// A publish whose index projection and/or fan-out was deferred because
/// the vector or keyword index was unhealthy at publish time.
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub project_id: String,
    pub sequence: i64,
    pub data_key: String,
    pub data: serde_json::Value,
    pub nodes: Vec<ContextNode>,
    pub threshold: f32,
}

#[derive(Default)]
pub struct Outbox {
    entries: Mutex<VecDeque<OutboxEntry>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: OutboxEntry) {
        self.entries.lock().push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every queued entry, in the order they were
    /// deferred.
    pub fn drain(&self) -> Vec<OutboxEntry> {
        self.entries.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(sequence: i64) -> OutboxEntry {
        OutboxEntry {
            project_id: "p".to_string(),
            sequence,
            data_key: "k".to_string(),
            data: json!({}),
            nodes: Vec::new(),
            threshold: 0.5,
        }
    }

    #[test]
    fn drains_in_fifo_order() {
        let outbox = Outbox::new();
        outbox.push(entry(1));
        outbox.push(entry(2));

        let drained = outbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].sequence, 1);
        assert_eq!(drained[1].sequence, 2);
        assert!(outbox.is_empty());
    }
}
