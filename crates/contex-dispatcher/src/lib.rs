//! Notification Dispatcher (spec §4.5).

pub mod circuit;
pub mod circuit_store;
pub mod dispatcher;
pub mod error;
pub mod pubsub;
pub mod queue;
pub mod retry;
pub mod signing;
pub mod webhook;

pub use circuit::{CircuitBreaker, CircuitBreakerManager, CircuitState};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatcherError, DispatcherResult};
pub use pubsub::PubSubHub;
pub use queue::AgentQueue;
pub use retry::RetryConfig;

/// Embedded migrations for the `webhook_circuit_state` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");
