//! The Vector Index (spec §4.3).

pub mod error;
pub mod index;

pub use error::{VectorIndexError, VectorIndexResult};
pub use index::{SearchHit, VectorIndex};

/// Embedded migrations for the `context_nodes` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");
