use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("agent not found: {0}")]
    NotFound(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

impl From<RegistryError> for contex_core::ContexError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => contex_core::ContexError::not_found(id),
            other @ RegistryError::Backend(_) => contex_core::ContexError::TransientBackend(other.into()),
        }
    }
}
