//! Per-agent ordered delivery queue (spec §4.5 ordering guarantee, §5
//! backpressure). `tokio::sync::mpsc` has no drop-oldest semantics, so this
//! wraps a bounded `VecDeque` with its own wake signal instead, matching the
//! "ring buffer wrapping the channel" shape called for in the dispatcher's
//! backpressure design.

use std::collections::VecDeque;
use std::sync::Mutex;

use contex_core::types::UpdateMessage;
use tokio::sync::Notify;

pub struct AgentQueue {
    inner: Mutex<VecDeque<UpdateMessage>>,
    notify: Notify,
    capacity: usize,
}

impl AgentQueue {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(VecDeque::with_capacity(capacity.min(64))), notify: Notify::new(), capacity: capacity.max(1) }
    }

    /// Enqueues `msg`, dropping the oldest queued update if at capacity.
    /// Returns `true` if an update was dropped to make room.
    pub fn push(&self, msg: UpdateMessage) -> bool {
        let dropped = {
            let mut queue = self.inner.lock().unwrap();
            let dropped = if queue.len() >= self.capacity { queue.pop_front().is_some() } else { false };
            queue.push_back(msg);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    /// Waits for and removes the oldest queued update.
    pub async fn pop(&self) -> UpdateMessage {
        loop {
            if let Some(msg) = self.inner.lock().unwrap().pop_front() {
                return msg;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}
