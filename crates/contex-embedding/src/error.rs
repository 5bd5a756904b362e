use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider request failed: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("embedding cache backend error: {0}")]
    Cache(#[source] sqlx::Error),

    #[error("provider returned a vector of unexpected dimension: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type EmbeddingResult<T> = std::result::Result<T, EmbeddingError>;

impl From<EmbeddingError> for contex_core::ContexError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Provider(e) => contex_core::ContexError::TransientBackend(e),
            EmbeddingError::Cache(e) => contex_core::ContexError::TransientBackend(e.into()),
            EmbeddingError::DimensionMismatch { .. } => {
                contex_core::ContexError::PermanentBackend(err.into())
            }
        }
    }
}
