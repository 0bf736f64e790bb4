//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Core library error.
    #[error("{0}")]
    Core(#[from] lexis_core::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(#[from] lexis_core::MigrationError),

    /// History database error.
    #[error("history database error: {0}")]
    History(#[from] sled::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
