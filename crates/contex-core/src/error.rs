//! The error taxonomy shared by every contex-* crate.

use thiserror::Error;

/// Top-level error surfaced by the engine façade. Component crates define
/// their own narrower error enums and convert into this one at the
/// boundary, preserving the original cause.
#[derive(Debug, Error)]
pub enum ContexError {
    /// Malformed input; never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown project, agent, or event.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate registration with an incompatible delivery mode.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Dependency momentarily unavailable. Already retried internally up to
    /// a small bound before reaching this variant.
    #[error("transient backend error: {0}")]
    TransientBackend(#[source] anyhow::Error),

    /// Schema/corruption class failure. Not retried; should raise an alert.
    #[error("permanent backend error: {0}")]
    PermanentBackend(#[source] anyhow::Error),

    /// Webhook retry budget exhausted. Never surfaced to a publisher —
    /// publishing is decoupled from delivery — but returned here so the
    /// dispatcher's own callers (tests, the degradation controller) can
    /// observe it.
    #[error("delivery failure: {0}")]
    Delivery(String),

    /// Deadline or client cancellation. Carries no partial commits.
    #[error("cancelled")]
    Cancelled,
}

impl ContexError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether retrying the operation that produced this error might
    /// eventually succeed without any caller-side change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientBackend(_))
    }
}

pub type ContexResult<T> = std::result::Result<T, ContexError>;
