//! Migration execution.
//!
//! Runs a [`MigrationPlan`](crate::recommendation::MigrationPlan) against an
//! [`EntityStore`](crate::store::EntityStore) with:
//! - Plan-level pre-checks and per-recommendation checks
//! - A row-count baseline before any mutation
//! - Batches in dependency order
//! - Reverse-order compensation on abort
//! - Execution history persisted in sled
//!
//! # Outcomes
//!
//! | Status | Meaning |
//! |--------|---------|
//! | **completed** | Every recommendation applied, every success criterion held |
//! | **completed-with-warnings** | Run finished, but a criterion failed or a recommendation failed without stopping |
//! | **rolled-back** | Aborted, every applied change compensated |
//! | **failed** | Pre-validation failed, or a compensating statement failed |
//!
//! # Example
//!
//! ```ignore
//! use lexis_core::migration::{ExecutionOptions, MigrationExecutor};
//!
//! let executor = MigrationExecutor::new(logger);
//! let options = ExecutionOptions::default().with_dry_run(true);
//! let execution = executor.execute(&plan, &mut store, &options)?;
//! println!("{}: {} applied", execution.status, execution.successful_migrations.len());
//! ```

mod backup;
mod checks;
mod error;
mod executor;
mod state;

// Checks
pub use checks::{CheckOutcome, SystemCheck, ValidationCheck};

// Error types
pub use error::MigrationError;

// State types
pub use backup::BackupInfo;
pub use state::{
    AppliedStatement, ExecutionError, ExecutionHistoryStore, ExecutionPhase, ExecutionRecord,
    ExecutionResult, ExecutionStatus, MigrationExecution, RecommendationStatus,
};

// Executor
pub use executor::{ExecutionOptions, MigrationExecutor};
