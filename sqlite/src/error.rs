//! Error types for store operations.
//!
//! Each variant corresponds to one store fault kind: opening, writing,
//! committing, reading, and lookup misses.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening, writing, or reading the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database directory could not be created.
    #[error("failed to create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database could not be opened or prepared for use.
    #[error("failed to open store '{}': {source}", path.display())]
    Init {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A read-only handle was requested for a file that was never ingested.
    #[error("store '{}' has no elements table", path.display())]
    NotInitialised { path: PathBuf },

    /// Inserting a record failed.
    #[error("failed to insert element {hjid}: {source}")]
    Write {
        hjid: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A record with this identifier already exists (strict mode only).
    #[error("duplicate element identifier: {0}")]
    DuplicateIdentifier(String),

    /// A write was attempted through a read-only handle.
    #[error("store is open read-only")]
    ReadOnly,

    /// Beginning or committing a batch transaction failed.
    #[error("failed to commit batch: {0}")]
    Commit(#[source] rusqlite::Error),

    /// A read query failed.
    #[error("query failed: {0}")]
    Read(#[source] rusqlite::Error),

    /// No element with the requested identifier exists.
    #[error("element not found: {0}")]
    NotFound(String),

    /// Closing the connection failed.
    #[error("failed to close store: {0}")]
    Close(#[source] rusqlite::Error),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
