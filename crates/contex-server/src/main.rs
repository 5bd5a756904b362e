use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use contex_core::{AppConfig, EngineConfig};
use contex_degradation::{spawn_probe_loop, DegradationController, Probes, DEFAULT_PROBE_INTERVAL};
use contex_dispatcher::{Dispatcher, DispatcherConfig, RetryConfig};
use contex_embedding::{EmbeddingService, HttpEmbeddingProvider};
use contex_engine::outbox::Outbox;
use contex_engine::{sweep::spawn_outbox_drain_loop, ContexEngine, EngineDeps};
use contex_eventlog::EventLog;
use contex_keywordindex::PgKeywordIndex;
use contex_matcher::SemanticMatcher;
use contex_registry::{spawn_idle_sweep, Registry};
use contex_server::health::{EmbeddingHealthCheck, KeywordIndexHealthCheck, PgHealthCheck, PubsubHealthCheck, VectorIndexHealthCheck};
use contex_server::routes;

#[derive(Parser)]
#[command(name = "contex-server", about = "Contex semantic context-routing service")]
struct Cli {
    /// HTTP port for the /healthz probe.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    tracing::info!("starting contex-server");

    let metrics_handle = PrometheusBuilder::new().install_recorder().context("installing metrics recorder")?;

    let cli = Cli::parse();
    let app_config = AppConfig::from_env().context("loading AppConfig from environment")?;
    let engine_config = EngineConfig::from_env();

    // Separate pools for the request path and background workers, same
    // split `rootsignal-server::main` uses so a slow background sweep can
    // never starve request-serving connections.
    let http_pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&app_config.database_url)
        .await
        .context("connecting http_pool")?;
    let worker_pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&app_config.database_url)
        .await
        .context("connecting worker_pool")?;

    run_migrations(&http_pool).await?;

    let event_log = EventLog::new(worker_pool.clone());
    let vector_index = Arc::new(contex_vectorindex::VectorIndex::new(worker_pool.clone()));
    let keyword_index: Option<Arc<dyn contex_keywordindex::KeywordIndex>> =
        if engine_config.hybrid_search_enabled { Some(Arc::new(PgKeywordIndex::new(worker_pool.clone()))) } else { None };

    let embedding_provider =
        Arc::new(HttpEmbeddingProvider::new(app_config.embedding_api_base.clone(), app_config.embedding_api_key.clone(), "text-embedding-3-small"));
    let embedding =
        Arc::new(EmbeddingService::new(embedding_provider, engine_config.embedding_cache_size, Some(worker_pool.clone())));

    let matcher = Arc::new(SemanticMatcher::new(embedding.clone(), vector_index.clone(), keyword_index.clone()));
    let registry = Registry::new(worker_pool.clone());
    let dispatcher = Arc::new(
        Dispatcher::new(
            worker_pool.clone(),
            registry.clone(),
            matcher.clone(),
            DispatcherConfig {
                queue_capacity: engine_config.delivery_queue_capacity,
                retry: RetryConfig { max_attempts: engine_config.webhook_max_attempts, ..RetryConfig::default() },
                circuit_failure_threshold: engine_config.circuit_failure_threshold,
                circuit_cooldown: engine_config.circuit_cooldown,
            },
        )
        .await
        .context("constructing dispatcher")?,
    );

    let degradation = Arc::new(DegradationController::new());
    let probes = Probes {
        event_log: Box::new(PgHealthCheck::new(worker_pool.clone())),
        vector_index: Box::new(VectorIndexHealthCheck::new(worker_pool.clone())),
        keyword_index: if engine_config.hybrid_search_enabled {
            Some(Box::new(KeywordIndexHealthCheck::new(worker_pool.clone())))
        } else {
            None
        },
        pubsub: Box::new(PubsubHealthCheck),
        embedding_model: Box::new(EmbeddingHealthCheck::new(embedding.clone())),
    };
    let _probe_loop = spawn_probe_loop(degradation.clone(), probes, DEFAULT_PROBE_INTERVAL);

    let deps = EngineDeps {
        pool: http_pool.clone(),
        event_log,
        vector_index,
        matcher,
        registry: registry.clone(),
        dispatcher: dispatcher.clone(),
        embedding,
        degradation: degradation.clone(),
        outbox: Arc::new(Outbox::new()),
        config: engine_config.clone(),
    };
    let engine = Arc::new(ContexEngine::new(deps));

    let _idle_sweep = spawn_idle_sweep(registry, engine_config.agent_idle_expiry, Duration::from_secs(3600));
    let _outbox_drain = spawn_outbox_drain_loop(engine.clone(), Duration::from_secs(5));

    let app_state = routes::AppState { degradation, dispatcher, metrics: metrics_handle };
    let router = routes::build_router(app_state);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("binding health listener")?;
    tracing::info!(%addr, "healthz listening");

    axum::serve(listener, router).await.context("axum server exited")?;

    Ok(())
}

async fn run_migrations(pool: &sqlx::PgPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(pool).await.context("creating vector extension")?;
    contex_eventlog::MIGRATOR.run(pool).await.context("running contex-eventlog migrations")?;
    contex_vectorindex::MIGRATOR.run(pool).await.context("running contex-vectorindex migrations")?;
    contex_keywordindex::MIGRATOR.run(pool).await.context("running contex-keywordindex migrations")?;
    contex_registry::MIGRATOR.run(pool).await.context("running contex-registry migrations")?;
    contex_dispatcher::MIGRATOR.run(pool).await.context("running contex-dispatcher migrations")?;
    contex_embedding::MIGRATOR.run(pool).await.context("running contex-embedding migrations")?;
    tracing::info!("migrations complete");
    Ok(())
}
