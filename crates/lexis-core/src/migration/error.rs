//! Migration-specific error types.

use crate::error::StoreError;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// An execution is already running on this executor.
    #[error("execution already in progress: {execution_id}")]
    ExecutionInProgress {
        /// The running execution.
        execution_id: String,
    },

    /// The plan cannot be executed as given.
    #[error("invalid plan: {message}")]
    InvalidPlan {
        /// What is wrong with it.
        message: String,
    },

    /// A pre-execution check failed.
    #[error("pre-validation check {check} failed: {detail}")]
    PreValidationFailed {
        /// Check name.
        check: String,
        /// Failure detail.
        detail: String,
    },

    /// A recommendation failed.
    #[error("recommendation {recommendation_id} failed: {message}")]
    StepFailed {
        /// The failed recommendation.
        recommendation_id: String,
        /// Error message.
        message: String,
    },

    /// A compensating statement failed.
    #[error("rollback failed: {reason}")]
    RollbackFailed {
        /// The reason rollback failed.
        reason: String,
    },

    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] crate::error::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
