use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorIndexError {
    #[error("vector index backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

pub type VectorIndexResult<T> = std::result::Result<T, VectorIndexError>;

impl From<VectorIndexError> for contex_core::ContexError {
    fn from(err: VectorIndexError) -> Self {
        contex_core::ContexError::TransientBackend(err.into())
    }
}
