//! The optional Keyword Index (spec §4.4).

pub mod error;
pub mod index;

pub use error::{KeywordIndexError, KeywordIndexResult};
pub use index::{KeywordHit, KeywordIndex, PgKeywordIndex};

/// Embedded migration adding the `search_vector` column to `context_nodes`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");
