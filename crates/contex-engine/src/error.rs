//! The façade's own error type. Wraps `ContexError` (the shared taxonomy)
//! and adds the two degradation-mode outcomes a caller needs to render a
//! response for (spec §4.8): a `Degraded` 503 with `Retry-After`, and an
//! `Unavailable` fail-fast. Same shallow-wrapping discipline as every other
//! `contex-*` crate's error enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Vector or keyword index unhealthy: semantic queries and
    /// registrations are rejected; publishes still go through.
    #[error("service degraded, retry after {retry_after_seconds}s")]
    Degraded { retry_after_seconds: u64 },

    /// Event log unhealthy: all mutating operations fail fast.
    #[error("service unavailable")]
    Unavailable,

    #[error(transparent)]
    Core(#[from] contex_core::ContexError),

    #[error("invalid data_format input: {0}")]
    Normalize(#[from] crate::normalize::NormalizeError),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl From<contex_eventlog::EventLogError> for EngineError {
    fn from(err: contex_eventlog::EventLogError) -> Self {
        Self::Core(err.into())
    }
}

impl From<contex_vectorindex::VectorIndexError> for EngineError {
    fn from(err: contex_vectorindex::VectorIndexError) -> Self {
        Self::Core(err.into())
    }
}

impl From<contex_registry::RegistryError> for EngineError {
    fn from(err: contex_registry::RegistryError) -> Self {
        Self::Core(err.into())
    }
}

impl From<contex_dispatcher::DispatcherError> for EngineError {
    fn from(err: contex_dispatcher::DispatcherError) -> Self {
        Self::Core(err.into())
    }
}

impl From<contex_embedding::EmbeddingError> for EngineError {
    fn from(err: contex_embedding::EmbeddingError) -> Self {
        Self::Core(err.into())
    }
}
