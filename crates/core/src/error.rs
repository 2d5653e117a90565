use thiserror::Error;

use crate::types::{BookId, UserId};

pub type ShelfwiseResult<T> = Result<T, ShelfwiseError>;

#[derive(Error, Debug)]
pub enum ShelfwiseError {
    #[error("User with id '{0}' was not found")]
    UnknownUser(UserId),

    #[error("Book with id '{0}' was not found")]
    UnknownBook(BookId),

    #[error("Review count {observed} for user '{user_id}' is inconsistent with the requested update")]
    InconsistentReviewCount { user_id: UserId, observed: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
