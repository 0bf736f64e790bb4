//! Lexis Core - compliance auditing and migration for tagged lexical datasets.
//!
//! This crate validates entities against a rule catalog, turns the issues
//! it finds into reviewable migration plans, and executes those plans with
//! compensation on failure.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod cache;
pub mod catalog;
pub mod compliance;
pub mod error;
pub mod logging;
pub mod migration;
pub mod model;
pub mod recommendation;
pub mod store;
pub mod terminology;

pub use cache::LookupCache;
pub use catalog::RuleCatalog;
pub use compliance::{
    ComplianceIssue, ComplianceStatus, ComplianceValidator, EntityComplianceReport, Severity,
    SystemComplianceReport, ValidatorConfig,
};
pub use error::{Error, StoreError};
pub use migration::{
    ExecutionOptions, ExecutionStatus, MigrationError, MigrationExecution, MigrationExecutor,
};
pub use model::{Dataset, Entity, EntityBundle, Form, Translation};
pub use recommendation::{MigrationPlan, MigrationRecommendation, RecommendationEngine};
pub use store::{EntityReader, EntityStore, MemoryStore, MutationStore};
pub use terminology::TerminologyConverter;

// Logging exports
pub use logging::{Logger, MemoryLogger, NullLogger, SharedLogger, TracingLogger};
