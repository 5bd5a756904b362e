use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("dispatcher backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub type DispatcherResult<T> = std::result::Result<T, DispatcherError>;

impl From<DispatcherError> for contex_core::ContexError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Backend(e) => contex_core::ContexError::TransientBackend(e.into()),
            DispatcherError::Delivery(msg) => contex_core::ContexError::Delivery(msg),
        }
    }
}
