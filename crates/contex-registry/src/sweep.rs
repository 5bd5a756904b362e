//! Idle-agent expiry sweep. Shape follows the periodic-interval background
//! workers in `rootsignal-scout-supervisor`: a `tokio::time::interval` loop
//! spawned onto its own task, logging what it did each tick rather than
//! propagating errors anywhere since there is no caller left to receive them.

use std::time::Duration;

use tracing::{info, warn};

use crate::registry::Registry;

/// Spawns a task that periodically deletes registrations idle longer than
/// `idle_expiry`. The returned handle can be aborted on shutdown.
pub fn spawn_idle_sweep(registry: Registry, idle_expiry: Duration, sweep_interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            match registry.expire_idle(idle_expiry).await {
                Ok(0) => {}
                Ok(n) => info!(expired = n, "swept idle agent registrations"),
                Err(err) => warn!(error = %err, "idle sweep failed, will retry next tick"),
            }
        }
    })
}
