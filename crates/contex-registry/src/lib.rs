//! Subscription Registry (spec §4.6).

pub mod error;
pub mod registry;
pub mod sweep;

pub use error::{RegistryError, RegistryResult};
pub use registry::{RegisterRequest, Registry};
pub use sweep::spawn_idle_sweep;

/// Embedded migrations for the `agent_registrations` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");
