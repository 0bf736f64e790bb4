//! Core error types.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Persistent storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Rule catalog is malformed.
    #[error("invalid rule catalog: {0}")]
    InvalidCatalog(String),

    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Errors raised by a backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The statement targets a row that does not exist.
    #[error("{table} row not found: {id}")]
    NotFound {
        /// Table name.
        table: String,
        /// Row id.
        id: String,
    },

    /// The store refused the statement.
    #[error("statement rejected: {0}")]
    Rejected(String),

    /// The statement is not supported by this store.
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    /// Backend failure (connection, IO).
    #[error("backend error: {0}")]
    Backend(String),
}
