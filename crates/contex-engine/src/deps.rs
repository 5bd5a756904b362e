//! Explicit dependency context (spec §9 "global singletons → explicit
//! context"). Grounded on `rootsignal-core::deps::ServerDeps`: every
//! component is constructed once at startup and handed to the engine by
//! `Arc`, never reached through a process-wide static.

use std::sync::Arc;

use sqlx::PgPool;

use contex_core::EngineConfig;
use contex_degradation::DegradationController;
use contex_dispatcher::Dispatcher;
use contex_embedding::EmbeddingService;
use contex_eventlog::EventLog;
use contex_matcher::SemanticMatcher;
use contex_registry::Registry;
use contex_vectorindex::VectorIndex;

use crate::outbox::Outbox;

/// Everything `ContexEngine` needs to sequence an operation. Cloning is
/// cheap (every field is a handle: a connection pool or an `Arc`).
#[derive(Clone)]
pub struct EngineDeps {
    pub pool: PgPool,
    pub event_log: EventLog,
    pub vector_index: Arc<VectorIndex>,
    pub matcher: Arc<SemanticMatcher>,
    pub registry: Registry,
    pub dispatcher: Arc<Dispatcher>,
    pub embedding: Arc<EmbeddingService>,
    pub degradation: Arc<DegradationController>,
    pub outbox: Arc<Outbox>,
    pub config: EngineConfig,
}
