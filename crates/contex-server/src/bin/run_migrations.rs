//! Standalone ops binary: applies every `contex-*` migration and exits.
//! Grounded on `rootsignal-server/src/bin/run_migrations.rs`'s one-shot
//! "connect, migrate, log, exit" shape.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use contex_core::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("loading AppConfig from environment")?;
    let pool = PgPoolOptions::new().max_connections(1).connect(&config.database_url).await.context("connecting to database")?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(&pool).await.context("creating vector extension")?;

    contex_eventlog::MIGRATOR.run(&pool).await.context("contex-eventlog migrations")?;
    contex_vectorindex::MIGRATOR.run(&pool).await.context("contex-vectorindex migrations")?;
    contex_keywordindex::MIGRATOR.run(&pool).await.context("contex-keywordindex migrations")?;
    contex_registry::MIGRATOR.run(&pool).await.context("contex-registry migrations")?;
    contex_dispatcher::MIGRATOR.run(&pool).await.context("contex-dispatcher migrations")?;
    contex_embedding::MIGRATOR.run(&pool).await.context("contex-embedding migrations")?;

    tracing::info!("all migrations applied");
    Ok(())
}
