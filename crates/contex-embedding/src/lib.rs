//! The Embedding Service (spec §4.1): an opaque `encode(text) -> vector`
//! function wrapped by a size-bounded, SHA-256-keyed cache.

pub mod cache;
pub mod error;
pub mod provider;

pub use cache::EmbeddingService;
pub use error::{EmbeddingError, EmbeddingResult};
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider, EMBEDDING_DIM};

/// Embedded migrations for the `embedding_cache` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");
