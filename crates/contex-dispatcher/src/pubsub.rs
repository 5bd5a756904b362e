//! In-process pub/sub broker (spec §4.5: "publish the JSON-encoded payload
//! on channel `agent:{agent_id}:updates`... non-blocking best-effort").
//! Generalizes the teacher's `NotifyRouter`/`NotifyBackend` multi-backend
//! routing (`rootsignal-scout-supervisor::notify`) from a fixed set of named
//! channels to one channel per live subscriber, keyed in a `dashmap`.

use dashmap::DashMap;
use tokio::sync::mpsc;

use contex_core::types::UpdateMessage;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
pub struct PubSubHub {
    subscribers: DashMap<String, mpsc::Sender<UpdateMessage>>,
}

impl PubSubHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live subscriber for `agent_id`'s channel, replacing any
    /// existing one (at most one live connection per agent is meaningful).
    pub fn subscribe(&self, agent_id: &str) -> mpsc::Receiver<UpdateMessage> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        self.subscribers.insert(agent_id.to_string(), tx);
        rx
    }

    pub fn unsubscribe(&self, agent_id: &str) {
        self.subscribers.remove(agent_id);
    }

    /// Best-effort publish: a missing or full subscriber channel is not an
    /// error, the agent is expected to reconcile via `read(since)`.
    pub fn publish(&self, agent_id: &str, message: UpdateMessage) -> bool {
        match self.subscribers.get(agent_id) {
            Some(sender) => sender.try_send(message).is_ok(),
            None => false,
        }
    }
}
