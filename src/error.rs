//! Error types for user operations

use crate::types::FormError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, non-success status or undecodable body
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid form: {0}")]
    InvalidForm(#[from] FormError),

    #[error("no user is being edited")]
    NotEditing,

    #[error("user {0} not found")]
    UserNotFound(u64),

    #[error("another request is still in progress")]
    Busy,
}

pub type Result<T> = std::result::Result<T, Error>;
