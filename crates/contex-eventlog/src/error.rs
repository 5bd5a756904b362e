use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

pub type EventLogResult<T> = std::result::Result<T, EventLogError>;

impl From<EventLogError> for contex_core::ContexError {
    fn from(err: EventLogError) -> Self {
        contex_core::ContexError::TransientBackend(err.into())
    }
}
