//! Configuration. Split the way `rootsignal-core::config` splits it:
//! secrets and environment-specific connection info in `AppConfig`, tunable
//! routing parameters (with baked-in defaults) in `EngineConfig`.

use anyhow::Result;
use std::time::Duration;

/// Secrets and environment-specific values loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub embedding_api_base: String,
    pub embedding_api_key: Option<String>,
    pub webhook_signing_default_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            embedding_api_base: std::env::var("EMBEDDING_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            embedding_api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            webhook_signing_default_secret: std::env::var("WEBHOOK_SIGNING_DEFAULT_SECRET").ok(),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("config loaded:");
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  EMBEDDING_API_BASE: {}", self.embedding_api_base);
        tracing::info!("  EMBEDDING_API_KEY: {}", preview_opt(&self.embedding_api_key));
        // webhook secrets are never previewed, even partially
        tracing::info!(
            "  WEBHOOK_SIGNING_DEFAULT_SECRET: {}",
            if self.webhook_signing_default_secret.is_some() { "<set>" } else { "<not set>" }
        );
    }
}

/// Tunable routing parameters (spec §6). Every field has a default baked in
/// here; `from_env` only overrides what the environment actually sets.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub similarity_threshold: f32,
    pub max_matches: usize,
    pub max_context_size: usize,
    pub hybrid_search_enabled: bool,
    pub bm25_weight: f32,
    pub knn_weight: f32,
    pub embedding_cache_size: usize,
    pub webhook_max_attempts: u32,
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown: Duration,
    pub agent_idle_expiry: Duration,
    pub event_retention: Duration,
    pub delivery_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            max_matches: 10,
            max_context_size: 51_200,
            hybrid_search_enabled: false,
            bm25_weight: 0.7,
            knn_weight: 0.3,
            embedding_cache_size: 10_000,
            webhook_max_attempts: 5,
            circuit_failure_threshold: 5,
            circuit_cooldown: Duration::from_secs(60),
            agent_idle_expiry: Duration::from_secs(7 * 24 * 3600),
            event_retention: Duration::from_secs(30 * 24 * 3600),
            delivery_queue_capacity: 1000,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SIMILARITY_THRESHOLD") {
            if let Ok(v) = v.parse() {
                config.similarity_threshold = v;
            }
        }
        if let Ok(v) = std::env::var("MAX_MATCHES") {
            if let Ok(v) = v.parse() {
                config.max_matches = v;
            }
        }
        if let Ok(v) = std::env::var("MAX_CONTEXT_SIZE") {
            if let Ok(v) = v.parse() {
                config.max_context_size = v;
            }
        }
        if let Ok(v) = std::env::var("HYBRID_SEARCH_ENABLED") {
            if let Ok(v) = v.parse() {
                config.hybrid_search_enabled = v;
            }
        }
        if let Ok(v) = std::env::var("BM25_WEIGHT") {
            if let Ok(v) = v.parse() {
                config.bm25_weight = v;
            }
        }
        if let Ok(v) = std::env::var("KNN_WEIGHT") {
            if let Ok(v) = v.parse() {
                config.knn_weight = v;
            }
        }
        if let Ok(v) = std::env::var("EMBEDDING_CACHE_SIZE") {
            if let Ok(v) = v.parse() {
                config.embedding_cache_size = v;
            }
        }
        if let Ok(v) = std::env::var("WEBHOOK_MAX_ATTEMPTS") {
            if let Ok(v) = v.parse() {
                config.webhook_max_attempts = v;
            }
        }
        if let Ok(v) = std::env::var("CIRCUIT_FAILURE_THRESHOLD") {
            if let Ok(v) = v.parse() {
                config.circuit_failure_threshold = v;
            }
        }
        if let Ok(v) = std::env::var("CIRCUIT_COOLDOWN_SECONDS") {
            if let Ok(v) = v.parse::<u64>() {
                config.circuit_cooldown = Duration::from_secs(v);
            }
        }
        if let Ok(v) = std::env::var("AGENT_IDLE_EXPIRY_DAYS") {
            if let Ok(v) = v.parse::<u64>() {
                config.agent_idle_expiry = Duration::from_secs(v * 24 * 3600);
            }
        }
        if let Ok(v) = std::env::var("EVENT_RETENTION_DAYS") {
            if let Ok(v) = v.parse::<u64>() {
                config.event_retention = Duration::from_secs(v * 24 * 3600);
            }
        }
        if let Ok(v) = std::env::var("DELIVERY_QUEUE_CAPACITY") {
            if let Ok(v) = v.parse() {
                config.delivery_queue_capacity = v;
            }
        }

        tracing::info!(?config, "engine config resolved");
        config
    }
}
