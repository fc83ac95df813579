use thiserror::Error;

#[derive(Error, Debug)]
pub enum TodoError {
    #[error("Invalid window parameter")]
    InvalidWindow,
    #[error("Invalid query parameter")]
    InvalidField(String),
    #[error("Invalid request body")]
    InvalidBody,
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Invalid deadline_at")]
    InvalidDeadline,
    #[error("Todo not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

