//! Periodic health probing. Each dependency is checked once at startup and
//! then on the `DEFAULT_PROBE_INTERVAL` cadence (spec §4.8: "periodic
//! health checks ... once at startup + on failure").

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::controller::DegradationController;

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> bool;
}

pub struct Probes {
    pub event_log: Box<dyn HealthCheck>,
    pub vector_index: Box<dyn HealthCheck>,
    pub keyword_index: Option<Box<dyn HealthCheck>>,
    pub pubsub: Box<dyn HealthCheck>,
    pub embedding_model: Box<dyn HealthCheck>,
}

/// Spawns the periodic probe loop. The keyword index is optional (spec
/// §4.3: "Keyword Index (optional)") — when absent it is treated as always
/// healthy so its absence never drags the service into `DEGRADED`.
pub fn spawn_probe_loop(controller: Arc<DegradationController>, probes: Probes, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_once(&controller, &probes).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // consume the immediate first tick, we already probed once above
        loop {
            ticker.tick().await;
            run_once(&controller, &probes).await;
        }
    })
}

async fn run_once(controller: &DegradationController, probes: &Probes) {
    controller.record_event_log(probes.event_log.check().await);
    controller.record_vector_index(probes.vector_index.check().await);
    controller.record_pubsub(probes.pubsub.check().await);
    controller.record_embedding_model(probes.embedding_model.check().await);

    match &probes.keyword_index {
        Some(check) => controller.record_keyword_index(check.check().await),
        None => controller.record_keyword_index(true),
    }
}
