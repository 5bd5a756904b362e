//! Degradation Controller (spec §4.8): derives the process-wide
//! `DegradationMode` from independently tracked dependency health.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::health::DependencyHealth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationMode {
    Normal,
    Degraded,
    Unavailable,
}

impl DegradationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Default)]
pub struct DegradationController {
    event_log: DependencyHealth,
    vector_index: DependencyHealth,
    keyword_index: DependencyHealth,
    pubsub: DependencyHealth,
    embedding_model: DependencyHealth,
    mode: Mutex<DegradationMode>,
}

impl Default for DegradationMode {
    fn default() -> Self {
        Self::Normal
    }
}

impl DegradationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DegradationMode {
        *self.mode.lock()
    }

    /// Suggested `Retry-After` (seconds) for callers surfacing a 503 while
    /// not `Normal`. Mirrors the circuit breaker's cooldown order of
    /// magnitude rather than the health tracker's own probe interval, since
    /// that is what the caller is actually waiting on.
    pub fn retry_after_seconds(&self) -> u64 {
        match self.mode() {
            DegradationMode::Normal => 0,
            DegradationMode::Degraded | DegradationMode::Unavailable => 5,
        }
    }

    pub fn record_event_log(&self, ok: bool) {
        if self.event_log.record(ok) {
            self.recompute("event_log", ok);
        }
    }

    pub fn record_vector_index(&self, ok: bool) {
        if self.vector_index.record(ok) {
            self.recompute("vector_index", ok);
        }
    }

    pub fn record_keyword_index(&self, ok: bool) {
        if self.keyword_index.record(ok) {
            self.recompute("keyword_index", ok);
        }
    }

    pub fn record_pubsub(&self, ok: bool) {
        if self.pubsub.record(ok) {
            self.recompute("pubsub", ok);
        }
    }

    pub fn record_embedding_model(&self, ok: bool) {
        if self.embedding_model.record(ok) {
            self.recompute("embedding_model", ok);
        }
    }

    fn recompute(&self, dependency: &str, became_healthy: bool) {
        let next = if !self.event_log.is_healthy() {
            DegradationMode::Unavailable
        } else if !self.vector_index.is_healthy() || !self.keyword_index.is_healthy() {
            DegradationMode::Degraded
        } else {
            DegradationMode::Normal
        };

        let mut mode = self.mode.lock();
        if *mode != next {
            if became_healthy {
                info!(%dependency, from = mode.as_str(), to = next.as_str(), "degradation mode improved");
            } else {
                warn!(%dependency, from = mode.as_str(), to = next.as_str(), "degradation mode worsened");
            }
            *mode = next;
        }
    }
}

/// How long a probe loop sleeps between health checks.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(15);
