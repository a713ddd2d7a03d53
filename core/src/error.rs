use thiserror::Error;

/// Errors surfaced by the tracking core.
///
/// `NotFound` and `Conflict` are part of normal control flow for callers;
/// `Storage` carries backend faults through unchanged. The core never retries.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CoreError {
    /// Maps the no-rows case of a single-row lookup to `NotFound`.
    pub(crate) fn from_lookup(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => CoreError::NotFound,
            other => CoreError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
