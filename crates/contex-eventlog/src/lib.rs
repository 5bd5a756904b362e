//! The Event Log (spec §4.2): append-only, per-project monotonically
//! sequenced, gap-free on read.

pub mod error;
pub mod notify;
pub mod store;

pub use error::{EventLogError, EventLogResult};
pub use store::{EventLog, MAX_READ_LIMIT};

/// Embedded migrations for the `events`/`project_sequences` tables.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");
