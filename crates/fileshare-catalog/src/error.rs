//! Error types for catalog operations.

use thiserror::Error;

/// Errors surfaced by [`crate::Catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backing store could not be opened or migrated.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// A requested file is not present in the catalog.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A mutation was rejected by the current lifecycle state (e.g. unpublishing a paused file).
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    /// The underlying SQLite driver returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A filesystem operation failed while computing a fingerprint.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
