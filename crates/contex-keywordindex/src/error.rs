use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeywordIndexError {
    #[error("keyword index backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

pub type KeywordIndexResult<T> = std::result::Result<T, KeywordIndexError>;

impl From<KeywordIndexError> for contex_core::ContexError {
    fn from(err: KeywordIndexError) -> Self {
        contex_core::ContexError::TransientBackend(err.into())
    }
}
