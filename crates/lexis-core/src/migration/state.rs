//! Execution state and history persistence.
//!
//! A [`MigrationExecution`] tracks one run of a plan in full detail. Its
//! summary, an [`ExecutionRecord`], is what gets persisted.

use super::backup::BackupInfo;
use super::error::MigrationError;
use crate::recommendation::MigrationPlan;
use crate::store::current_timestamp;
use rkyv::Archive;
use serde::{Deserialize, Serialize};

/// State of an execution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    /// Created but not started.
    Pending,
    /// In progress.
    Running,
    /// Every recommendation succeeded and every success criterion held.
    Completed,
    /// Finished, but a success criterion failed or a recommendation failed
    /// without stopping the run.
    CompletedWithWarnings,
    /// Aborted, or a rollback statement failed.
    Failed,
    /// Aborted and fully compensated.
    RolledBack,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::CompletedWithWarnings => write!(f, "completed-with-warnings"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::RolledBack => write!(f, "rolled-back"),
        }
    }
}

/// State of one recommendation within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationStatus {
    /// Not yet attempted.
    Pending,
    /// Applied.
    Completed,
    /// Nothing to run (manual review).
    Skipped,
    /// A check or statement failed.
    Failed,
    /// Applied, then compensated.
    RolledBack,
}

impl std::fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationStatus::Pending => write!(f, "pending"),
            RecommendationStatus::Completed => write!(f, "completed"),
            RecommendationStatus::Skipped => write!(f, "skipped"),
            RecommendationStatus::Failed => write!(f, "failed"),
            RecommendationStatus::RolledBack => write!(f, "rolled-back"),
        }
    }
}

/// Executor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionPhase {
    /// Plan-level pre-checks.
    PreValidation,
    /// Row-count baseline.
    Backup,
    /// Batch execution.
    Execution,
    /// Success criteria.
    PostValidation,
    /// Compensation.
    Rollback,
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionPhase::PreValidation => write!(f, "pre-validation"),
            ExecutionPhase::Backup => write!(f, "backup"),
            ExecutionPhase::Execution => write!(f, "execution"),
            ExecutionPhase::PostValidation => write!(f, "post-validation"),
            ExecutionPhase::Rollback => write!(f, "rollback"),
        }
    }
}

/// An error recorded during an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Phase it happened in.
    pub phase: ExecutionPhase,
    /// Recommendation involved, if any.
    pub recommendation_id: Option<String>,
    /// Batch involved, if any.
    pub batch_id: Option<String>,
    /// Message.
    pub message: String,
    /// Whether an operator can retry. Rollback errors are not recoverable.
    pub recoverable: bool,
    /// When it happened (microseconds since epoch).
    pub timestamp: u64,
}

impl ExecutionError {
    /// Create an error for a phase.
    pub fn new(phase: ExecutionPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            recommendation_id: None,
            batch_id: None,
            message: message.into(),
            recoverable: phase != ExecutionPhase::Rollback,
            timestamp: current_timestamp(),
        }
    }

    /// Attach the recommendation and batch.
    pub fn at(mut self, recommendation_id: &str, batch_id: &str) -> Self {
        self.recommendation_id = Some(recommendation_id.to_string());
        self.batch_id = Some(batch_id.to_string());
        self
    }
}

/// A statement that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedStatement {
    /// Index into the recommendation's forward statements.
    pub index: usize,
    /// SQL text.
    pub sql: String,
    /// Rows affected.
    pub rows_affected: u64,
}

/// Outcome of one recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Recommendation id.
    pub recommendation_id: String,
    /// Batch id.
    pub batch_id: String,
    /// Status.
    pub status: RecommendationStatus,
    /// Rows affected by the forward statements.
    pub rows_affected: u64,
    /// Statements applied, in order.
    pub applied: Vec<AppliedStatement>,
    /// Checks that failed.
    pub validation_failures: Vec<String>,
    /// Error message.
    pub error: Option<String>,
    /// When it started (microseconds since epoch).
    pub started_at: u64,
    /// When it finished (microseconds since epoch).
    pub completed_at: Option<u64>,
}

impl ExecutionResult {
    /// Start tracking a recommendation.
    pub fn start(recommendation_id: &str, batch_id: &str) -> Self {
        Self {
            recommendation_id: recommendation_id.to_string(),
            batch_id: batch_id.to_string(),
            status: RecommendationStatus::Pending,
            rows_affected: 0,
            applied: Vec::new(),
            validation_failures: Vec::new(),
            error: None,
            started_at: current_timestamp(),
            completed_at: None,
        }
    }

    /// Mark as applied.
    pub fn complete(&mut self) {
        self.status = RecommendationStatus::Completed;
        self.completed_at = Some(current_timestamp());
    }

    /// Mark as skipped.
    pub fn skip(&mut self) {
        self.status = RecommendationStatus::Skipped;
        self.completed_at = Some(current_timestamp());
    }

    /// Mark as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RecommendationStatus::Failed;
        self.completed_at = Some(current_timestamp());
        self.error = Some(error.into());
    }

    /// Mark as compensated.
    pub fn rollback(&mut self) {
        self.status = RecommendationStatus::RolledBack;
    }
}

/// One run of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationExecution {
    /// Execution id.
    pub id: String,
    /// Plan id.
    pub plan_id: String,
    /// Digest of the plan that ran.
    pub plan_digest: String,
    /// Status.
    pub status: ExecutionStatus,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// When it started (microseconds since epoch).
    pub started_at: Option<u64>,
    /// When it finished (microseconds since epoch).
    pub completed_at: Option<u64>,
    /// Row-count baseline.
    pub backup: Option<BackupInfo>,
    /// Per-recommendation outcomes, in execution order.
    pub results: Vec<ExecutionResult>,
    /// Applied recommendations.
    pub successful_migrations: Vec<String>,
    /// Failed recommendations.
    pub failed_migrations: Vec<String>,
    /// Manual-review recommendations.
    pub skipped: Vec<String>,
    /// Compensated recommendations.
    pub rolled_back: Vec<String>,
    /// Errors.
    pub errors: Vec<ExecutionError>,
    /// Warnings from post-validation.
    pub warnings: Vec<String>,
    /// Rows affected by forward statements.
    pub total_rows_affected: u64,
}

impl MigrationExecution {
    /// Create a pending execution for a plan.
    pub fn new(id: impl Into<String>, plan: &MigrationPlan, dry_run: bool) -> Self {
        Self {
            id: id.into(),
            plan_id: plan.id.clone(),
            plan_digest: plan.digest.clone(),
            status: ExecutionStatus::Pending,
            dry_run,
            started_at: None,
            completed_at: None,
            backup: None,
            results: Vec::new(),
            successful_migrations: Vec::new(),
            failed_migrations: Vec::new(),
            skipped: Vec::new(),
            rolled_back: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            total_rows_affected: 0,
        }
    }

    /// Start the execution.
    pub fn start(&mut self) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(current_timestamp());
    }

    /// Finish with a terminal status.
    pub fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.completed_at = Some(current_timestamp());
    }

    /// Check if the execution is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Completed
                | ExecutionStatus::CompletedWithWarnings
                | ExecutionStatus::Failed
                | ExecutionStatus::RolledBack
        )
    }

    /// Outcome of a recommendation.
    pub fn result(&self, recommendation_id: &str) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.recommendation_id == recommendation_id)
    }

    /// Errors that cannot be retried.
    pub fn unrecoverable_errors(&self) -> Vec<&ExecutionError> {
        self.errors.iter().filter(|e| !e.recoverable).collect()
    }

    /// Summary for persistence.
    pub fn to_record(&self) -> ExecutionRecord {
        ExecutionRecord {
            execution_id: self.id.clone(),
            plan_id: self.plan_id.clone(),
            plan_digest: self.plan_digest.clone(),
            status: self.status,
            dry_run: self.dry_run,
            started_at: self.started_at,
            completed_at: self.completed_at,
            successful: self.successful_migrations.clone(),
            failed: self.failed_migrations.clone(),
            skipped: self.skipped.clone(),
            rolled_back: self.rolled_back.clone(),
            error_count: self.errors.len(),
            unrecoverable_count: self.unrecoverable_errors().len(),
            warnings: self.warnings.clone(),
            total_rows_affected: self.total_rows_affected,
        }
    }
}

/// Persisted execution summary.
#[derive(Debug, Clone, PartialEq, Eq, Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct ExecutionRecord {
    /// Execution id.
    pub execution_id: String,
    /// Plan id.
    pub plan_id: String,
    /// Plan digest.
    pub plan_digest: String,
    /// Final status.
    pub status: ExecutionStatus,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// When it started (microseconds since epoch).
    pub started_at: Option<u64>,
    /// When it finished (microseconds since epoch).
    pub completed_at: Option<u64>,
    /// Applied recommendation ids.
    pub successful: Vec<String>,
    /// Failed recommendation ids.
    pub failed: Vec<String>,
    /// Skipped recommendation ids.
    pub skipped: Vec<String>,
    /// Compensated recommendation ids.
    pub rolled_back: Vec<String>,
    /// Number of errors.
    pub error_count: usize,
    /// Number of errors that cannot be retried.
    pub unrecoverable_count: usize,
    /// Post-validation warnings.
    pub warnings: Vec<String>,
    /// Rows affected.
    pub total_rows_affected: u64,
}

impl ExecutionRecord {
    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MigrationError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| MigrationError::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MigrationError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| MigrationError::Deserialization(e.to_string()))
    }
}

/// Execution history persistence.
pub struct ExecutionHistoryStore {
    tree: sled::Tree,
}

impl ExecutionHistoryStore {
    /// Tree name for execution history.
    pub const TREE_NAME: &'static str = "migration:history";

    /// Open or create the history store.
    pub fn open(db: &sled::Db) -> Result<Self, MigrationError> {
        let tree = db
            .open_tree(Self::TREE_NAME)
            .map_err(|e| MigrationError::Storage(crate::error::Error::Storage(e)))?;
        Ok(Self { tree })
    }

    /// Save a record.
    pub fn save(&self, record: &ExecutionRecord) -> Result<(), MigrationError> {
        let value = record.to_bytes()?;
        self.tree
            .insert(record.execution_id.as_bytes(), value)
            .map_err(|e| MigrationError::Storage(crate::error::Error::Storage(e)))?;
        Ok(())
    }

    /// Load a record.
    pub fn load(&self, execution_id: &str) -> Result<Option<ExecutionRecord>, MigrationError> {
        match self
            .tree
            .get(execution_id.as_bytes())
            .map_err(|e| MigrationError::Storage(crate::error::Error::Storage(e)))?
        {
            Some(bytes) => Ok(Some(ExecutionRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List all records, ordered by start time.
    pub fn list(&self) -> Result<Vec<ExecutionRecord>, MigrationError> {
        let mut records = Vec::new();
        for result in self.tree.iter() {
            let (_, value) = result.map_err(|e| MigrationError::Storage(crate::error::Error::Storage(e)))?;
            records.push(ExecutionRecord::from_bytes(&value)?);
        }
        records.sort_by_key(|r| r.started_at);
        Ok(records)
    }

    /// Flush to disk.
    pub fn flush(&self) -> Result<(), MigrationError> {
        self.tree
            .flush()
            .map_err(|e| MigrationError::Storage(crate::error::Error::Storage(e)))?;
        Ok(())
    }
}
