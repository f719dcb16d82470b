//! Pagination Error Types
//!
//! Errors are `Clone` so a memoized failure can be handed to every caller
//! that awaits the same slot.

use thiserror::Error;

use crate::record::RecordId;
use folio_config::ConfigError;

/// Errors raised by a [`QueryEngine`](crate::store::QueryEngine)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for query engine calls
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create a generic backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a query rejection error
    pub fn rejected<S: Into<String>>(msg: S) -> Self {
        Self::Rejected(msg.into())
    }

    /// Check if a caller could reasonably retry the request.
    ///
    /// The pagination engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Errors surfaced by the pagination engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// The `after` cursor does not identify a record in the query's result set
    #[error("Cursor not found: {cursor}")]
    CursorNotFound { cursor: RecordId },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sort field and order must be given together
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Invalid page size {requested}: must be between 1 and {max}")]
    InvalidPageSize { requested: usize, max: usize },

    #[error("Configuration error: {0}")]
    Config(ConfigError),
}

/// Result type for pagination operations
pub type PaginationResult<T> = Result<T, PaginationError>;

impl PaginationError {
    /// Check if the error was caused by a stale or foreign cursor
    pub fn is_cursor_not_found(&self) -> bool {
        matches!(self, Self::CursorNotFound { .. })
    }
}

impl From<ConfigError> for PaginationError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::PageSize { requested, max } => Self::InvalidPageSize { requested, max },
            other => Self::Config(other),
        }
    }
}
