//! Background loop draining the outbox on recovery (spec §4.8: "drained
//! on recovery"). Same periodic-interval shape as the registry's idle
//! sweep and the degradation controller's probe loop — poll, act, log what
//! happened, never propagate an error anywhere since there is no caller
//! left to receive one.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use contex_degradation::DegradationMode;

use crate::engine::ContexEngine;

/// Polls the degradation mode; whenever it is (or returns to) `Normal` and
/// the outbox is non-empty, drains and replays every deferred publish.
pub fn spawn_outbox_drain_loop(engine: Arc<ContexEngine>, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            if engine.deps().degradation.mode() != DegradationMode::Normal {
                continue;
            }
            if engine.deps().outbox.is_empty() {
                continue;
            }
            match engine.drain_outbox().await {
                Ok(0) => {}
                Ok(n) => info!(replayed = n, "drained outbox after recovery"),
                Err(err) => warn!(error = %err, "outbox drain failed, will retry next tick"),
            }
        }
    })
}
