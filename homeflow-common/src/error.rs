//! Common error types for Homeflow

use thiserror::Error;

/// Common result type for Homeflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Homeflow services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error indicates the persistence layer itself is
    /// unreachable (pool exhausted/closed, connection lost), as opposed to
    /// an operation that was rejected by a reachable store.
    ///
    /// Callers surface these separately: store-unavailable failures are
    /// reported to the producer for later retry of the whole operation and
    /// never consume a job's retry budget.
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::PoolTimedOut) => true,
            Error::Database(sqlx::Error::PoolClosed) => true,
            Error::Database(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }
}
