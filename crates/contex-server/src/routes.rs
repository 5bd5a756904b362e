//! The one HTTP surface this binary owns directly: a health probe.
//! Everything else (publish/query/register) is the out-of-scope API
//! layer's job (spec §1 Non-goals) — this crate exists to wire the engine
//! to a process, not to expose it.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use contex_degradation::DegradationController;
use contex_dispatcher::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub degradation: Arc<DegradationController>,
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: PrometheusHandle,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render()
}

#[derive(Serialize)]
struct CircuitSnapshot {
    destination_url: String,
    state: &'static str,
    consecutive_failures: u32,
}

#[derive(Serialize)]
struct HealthResponse {
    mode: &'static str,
    circuits: Vec<CircuitSnapshot>,
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let circuits = state
        .dispatcher
        .circuit_snapshot()
        .into_iter()
        .map(|(destination_url, circuit_state, consecutive_failures)| CircuitSnapshot {
            destination_url,
            state: circuit_state.as_str(),
            consecutive_failures,
        })
        .collect();

    Json(HealthResponse { mode: state.degradation.mode().as_str(), circuits })
}
