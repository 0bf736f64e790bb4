//! Migration executor - runs a plan against a store.
//!
//! Phases run strictly in sequence: pre-validation, backup, batch execution,
//! post-validation. A failure with `stop_on_error` set aborts the run and
//! replays the compensating statements of every applied recommendation in
//! reverse order.
//!
//! A dry run records statements in a [`PlannedOverlay`] instead of executing
//! them, so per-item checks see the effects of earlier recommendations.

use super::backup::BackupInfo;
use super::checks::ValidationCheck;
use super::error::MigrationError;
use super::state::{
    AppliedStatement, ExecutionError, ExecutionHistoryStore, ExecutionPhase, ExecutionResult,
    ExecutionStatus, MigrationExecution,
};
use crate::logging::SharedLogger;
use crate::recommendation::{generate_plan_id, MigrationPlan, MigrationRecommendation};
use crate::store::{EntityReader, EntityStore, PlannedOverlay};
use parking_lot::Mutex;
use std::time::Duration;

/// Execution options.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Run checks and log statements without mutating the store.
    pub dry_run: bool,
    /// Abort and roll back on the first failed recommendation.
    pub stop_on_error: bool,
    /// Skip plan-level pre-checks and success criteria.
    pub skip_validation: bool,
    /// Pause between batches.
    pub batch_delay: Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            stop_on_error: true,
            skip_validation: false,
            batch_delay: Duration::from_millis(100),
        }
    }
}

impl ExecutionOptions {
    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set stop-on-error.
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Set skip-validation.
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// Set the delay between batches.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }
}

/// A recommendation that was applied, with the forward statements that
/// changed rows.
struct Applied<'p> {
    rec: &'p MigrationRecommendation,
    batch_id: &'p str,
    result_index: usize,
    statements: Vec<usize>,
}

struct ItemFailure {
    message: String,
    applied: Vec<usize>,
}

/// Clears the active execution slot on drop.
struct ActiveGuard<'a> {
    slot: &'a Mutex<Option<String>>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

/// Migration executor - runs plans and keeps their history.
pub struct MigrationExecutor {
    logger: SharedLogger,
    history_store: Option<ExecutionHistoryStore>,
    history: Mutex<Vec<MigrationExecution>>,
    active: Mutex<Option<String>>,
}

impl MigrationExecutor {
    /// Create an executor with in-memory history only.
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            logger,
            history_store: None,
            history: Mutex::new(Vec::new()),
            active: Mutex::new(None),
        }
    }

    /// Also persist execution summaries.
    pub fn with_history_store(mut self, store: ExecutionHistoryStore) -> Self {
        self.history_store = Some(store);
        self
    }

    /// Executions run in this session, oldest first.
    pub fn history(&self) -> Vec<MigrationExecution> {
        self.history.lock().clone()
    }

    /// The most recent execution.
    pub fn last_execution(&self) -> Option<MigrationExecution> {
        self.history.lock().last().cloned()
    }

    /// Id of the running execution, if any.
    pub fn active_execution(&self) -> Option<String> {
        self.active.lock().clone()
    }

    /// Batch indices in an order that honors every declared dependency.
    /// Ties keep plan order.
    pub fn execution_order(plan: &MigrationPlan) -> Result<Vec<usize>, MigrationError> {
        let ids: Vec<&str> = plan.batches.iter().map(|b| b.id.as_str()).collect();
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(MigrationError::InvalidPlan {
                    message: format!("duplicate batch id '{}'", id),
                });
            }
        }
        for batch in &plan.batches {
            for dep in &batch.dependencies {
                if !ids.contains(&dep.as_str()) {
                    return Err(MigrationError::InvalidPlan {
                        message: format!("batch '{}' depends on unknown batch '{}'", batch.id, dep),
                    });
                }
            }
        }

        let n = plan.batches.len();
        let mut done = vec![false; n];
        let mut order = Vec::with_capacity(n);
        while order.len() < n {
            let ready = (0..n).find(|&i| {
                !done[i]
                    && plan.batches[i].dependencies.iter().all(|d| {
                        ids.iter()
                            .position(|id| *id == d.as_str())
                            .is_some_and(|j| done[j])
                    })
            });
            match ready {
                Some(i) => {
                    done[i] = true;
                    order.push(i);
                }
                None => {
                    let stuck: Vec<&str> = (0..n).filter(|&i| !done[i]).map(|i| ids[i]).collect();
                    return Err(MigrationError::InvalidPlan {
                        message: format!("dependency cycle among batches: {}", stuck.join(", ")),
                    });
                }
            }
        }
        Ok(order)
    }

    /// Execute a plan.
    ///
    /// Check and statement failures are recorded on the returned execution.
    /// `Err` is reserved for plans that cannot run at all and for history
    /// persistence failures.
    pub fn execute<S>(
        &self,
        plan: &MigrationPlan,
        store: &mut S,
        options: &ExecutionOptions,
    ) -> Result<MigrationExecution, MigrationError>
    where
        S: EntityStore + ?Sized,
    {
        let order = Self::execution_order(plan)?;
        if !plan.verify_digest() {
            return Err(MigrationError::InvalidPlan {
                message: "statements do not match the plan digest".to_string(),
            });
        }

        let execution_id = format!("exec-{}", generate_plan_id());
        let _guard = self.acquire(&execution_id)?;

        let mut execution = MigrationExecution::new(&execution_id, plan, options.dry_run);
        execution.start();
        self.logger.info(
            "migration.started",
            &[
                ("execution_id", execution_id.clone()),
                ("plan_id", plan.id.clone()),
                ("batches", plan.batches.len().to_string()),
                ("dry_run", options.dry_run.to_string()),
            ],
        );

        let status = self.run(plan, &order, store, options, &mut execution);
        execution.finish(status);

        let fields = [
            ("execution_id", execution.id.clone()),
            ("status", status.to_string()),
            ("successful", execution.successful_migrations.len().to_string()),
            ("failed", execution.failed_migrations.len().to_string()),
            ("rolled_back", execution.rolled_back.len().to_string()),
            ("rows_affected", execution.total_rows_affected.to_string()),
        ];
        match status {
            ExecutionStatus::Completed => self.logger.info("migration.completed", &fields),
            ExecutionStatus::CompletedWithWarnings | ExecutionStatus::RolledBack => {
                self.logger.warn("migration.completed", &fields)
            }
            _ => self.logger.error("migration.completed", &fields),
        }

        self.record(&execution)?;
        Ok(execution)
    }

    fn acquire(&self, execution_id: &str) -> Result<ActiveGuard<'_>, MigrationError> {
        let mut active = self.active.lock();
        if let Some(running) = active.as_ref() {
            return Err(MigrationError::ExecutionInProgress {
                execution_id: running.clone(),
            });
        }
        *active = Some(execution_id.to_string());
        Ok(ActiveGuard { slot: &self.active })
    }

    fn record(&self, execution: &MigrationExecution) -> Result<(), MigrationError> {
        self.history.lock().push(execution.clone());
        if let Some(store) = &self.history_store {
            store.save(&execution.to_record())?;
        }
        Ok(())
    }

    fn run<S>(
        &self,
        plan: &MigrationPlan,
        order: &[usize],
        store: &mut S,
        options: &ExecutionOptions,
        execution: &mut MigrationExecution,
    ) -> ExecutionStatus
    where
        S: EntityStore + ?Sized,
    {
        // Phase 1: pre-validation
        if !options.skip_validation && !self.pre_validate(&*store, plan, execution) {
            return ExecutionStatus::Failed;
        }

        // Phase 2: backup
        match BackupInfo::capture(&*store, plan) {
            Ok(backup) => {
                self.logger.info(
                    "migration.backup_captured",
                    &[
                        ("execution_id", execution.id.clone()),
                        ("tables", backup.row_counts.len().to_string()),
                        ("digest", backup.digest.clone()),
                    ],
                );
                execution.backup = Some(backup);
            }
            Err(e) => {
                execution.errors.push(ExecutionError::new(ExecutionPhase::Backup, e.to_string()));
                self.logger.error(
                    "migration.backup_failed",
                    &[("execution_id", execution.id.clone()), ("error", e.to_string())],
                );
                return ExecutionStatus::Failed;
            }
        }

        // Phase 3: batches
        let mut planned = options.dry_run.then(PlannedOverlay::new);
        let mut completed: Vec<Applied<'_>> = Vec::new();
        let mut aborted = false;
        'batches: for (position, &batch_index) in order.iter().enumerate() {
            let batch = &plan.batches[batch_index];
            if position > 0 && !options.dry_run && !options.batch_delay.is_zero() {
                std::thread::sleep(options.batch_delay);
            }
            self.logger.info(
                "migration.batch_started",
                &[
                    ("execution_id", execution.id.clone()),
                    ("batch_id", batch.id.clone()),
                    ("recommendations", batch.len().to_string()),
                ],
            );

            for rec in &batch.recommendations {
                let mut result = ExecutionResult::start(&rec.id, &batch.id);
                if !rec.is_executable() {
                    result.skip();
                    execution.skipped.push(rec.id.clone());
                    execution.results.push(result);
                    continue;
                }

                match self.apply(rec, store, options, planned.as_mut(), &mut result) {
                    Ok(statements) => {
                        result.complete();
                        execution.total_rows_affected += result.rows_affected;
                        execution.successful_migrations.push(rec.id.clone());
                        completed.push(Applied {
                            rec,
                            batch_id: &batch.id,
                            result_index: execution.results.len(),
                            statements,
                        });
                        execution.results.push(result);
                    }
                    Err(failure) => {
                        // Undo this recommendation's own partial changes first.
                        for reason in self.compensate(rec, &failure.applied, store) {
                            self.push_rollback_error(execution, rec, &batch.id, reason);
                        }
                        let err = MigrationError::StepFailed {
                            recommendation_id: rec.id.clone(),
                            message: failure.message.clone(),
                        };
                        self.logger.error(
                            "migration.recommendation_failed",
                            &[
                                ("execution_id", execution.id.clone()),
                                ("batch_id", batch.id.clone()),
                                ("recommendation_id", rec.id.clone()),
                                ("error", failure.message.clone()),
                            ],
                        );
                        result.fail(failure.message);
                        execution.errors.push(
                            ExecutionError::new(ExecutionPhase::Execution, err.to_string()).at(&rec.id, &batch.id),
                        );
                        execution.failed_migrations.push(rec.id.clone());
                        execution.results.push(result);
                        if options.stop_on_error {
                            aborted = true;
                            break 'batches;
                        }
                    }
                }
            }
        }

        if aborted {
            if options.dry_run {
                return ExecutionStatus::Failed;
            }
            return self.rollback(completed, store, execution);
        }

        // Phase 4: post-validation
        if !options.skip_validation {
            match &planned {
                Some(overlay) => self.post_validate(&overlay.view(&*store), plan, execution),
                None => self.post_validate(&*store, plan, execution),
            }
        }

        if execution.warnings.is_empty() && execution.failed_migrations.is_empty() {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::CompletedWithWarnings
        }
    }

    fn pre_validate<R>(&self, reader: &R, plan: &MigrationPlan, execution: &mut MigrationExecution) -> bool
    where
        R: EntityReader + ?Sized,
    {
        let mut passed = true;
        for check in &plan.pre_checks {
            let (ok, detail) = match check.evaluate(reader, plan) {
                Ok(outcome) => (outcome.passed, outcome.detail.unwrap_or_default()),
                Err(e) => (false, e.to_string()),
            };
            if ok {
                continue;
            }
            passed = false;
            let err = MigrationError::PreValidationFailed {
                check: check.name().to_string(),
                detail: detail.clone(),
            };
            self.logger.error(
                "migration.pre_validation_failed",
                &[
                    ("execution_id", execution.id.clone()),
                    ("check", check.name().to_string()),
                    ("detail", detail),
                ],
            );
            execution
                .errors
                .push(ExecutionError::new(ExecutionPhase::PreValidation, err.to_string()));
        }
        passed
    }

    fn post_validate<R>(&self, reader: &R, plan: &MigrationPlan, execution: &mut MigrationExecution)
    where
        R: EntityReader + ?Sized,
    {
        let mut warnings = Vec::new();
        for check in &plan.success_criteria {
            match check.evaluate(reader, plan) {
                Ok(outcome) if outcome.passed => {}
                Ok(outcome) => warnings.push(format!(
                    "{}: {}",
                    check,
                    outcome.detail.unwrap_or_default()
                )),
                Err(e) => warnings.push(format!("{}: {}", check, e)),
            }
        }
        if let Some(backup) = &execution.backup {
            match backup.drift(reader) {
                Ok(drift) => warnings.extend(drift.into_iter().map(|d| format!("row count drift: {}", d))),
                Err(e) => warnings.push(format!("row count drift: {}", e)),
            }
        }
        for warning in &warnings {
            self.logger.warn(
                "migration.success_criterion_failed",
                &[("execution_id", execution.id.clone()), ("detail", warning.clone())],
            );
        }
        execution.warnings.extend(warnings);
    }

    /// Apply one recommendation. Returns the indices of forward statements
    /// that changed rows.
    fn apply<S>(
        &self,
        rec: &MigrationRecommendation,
        store: &mut S,
        options: &ExecutionOptions,
        planned: Option<&mut PlannedOverlay>,
        result: &mut ExecutionResult,
    ) -> Result<Vec<usize>, ItemFailure>
    where
        S: EntityStore + ?Sized,
    {
        let run_checks = !options.skip_validation || rec.validation_required;
        if let Some(planned) = planned {
            return self.plan(rec, &*store, planned, run_checks, result);
        }

        if run_checks {
            require(&rec.pre_checks, &*store, "pre-check", result, &[])?;
        }

        let mut applied = Vec::new();
        for (index, statement) in rec.forward.iter().enumerate() {
            match store.execute(statement) {
                Ok(rows) => {
                    self.logger.debug(
                        "migration.statement_applied",
                        &[
                            ("recommendation_id", rec.id.clone()),
                            ("sql", statement.sql.clone()),
                            ("rows", rows.to_string()),
                        ],
                    );
                    result.rows_affected += rows;
                    result.applied.push(AppliedStatement {
                        index,
                        sql: statement.sql.clone(),
                        rows_affected: rows,
                    });
                    if rows > 0 {
                        applied.push(index);
                    }
                }
                Err(e) => {
                    return Err(ItemFailure {
                        message: e.to_string(),
                        applied,
                    })
                }
            }
        }

        if run_checks {
            require(&rec.post_checks, &*store, "post-check", result, &applied)?;
        }
        Ok(applied)
    }

    /// Dry-run counterpart of [`apply`](Self::apply): statements are
    /// recorded in the overlay and checks read through it. A failing
    /// recommendation leaves the overlay as it was.
    fn plan<R>(
        &self,
        rec: &MigrationRecommendation,
        base: &R,
        planned: &mut PlannedOverlay,
        run_checks: bool,
        result: &mut ExecutionResult,
    ) -> Result<Vec<usize>, ItemFailure>
    where
        R: EntityReader + ?Sized,
    {
        if run_checks {
            require(&rec.pre_checks, &planned.view(base), "pre-check", result, &[])?;
        }

        let mut scratch = planned.clone();
        for statement in &rec.forward {
            let rows = scratch.record(base, statement).map_err(|e| ItemFailure {
                message: e.to_string(),
                applied: Vec::new(),
            })?;
            self.logger.info(
                "migration.statement_planned",
                &[
                    ("recommendation_id", rec.id.clone()),
                    ("sql", statement.sql.clone()),
                    ("rows", rows.to_string()),
                ],
            );
        }

        if run_checks {
            require(&rec.post_checks, &scratch.view(base), "post-check", result, &[])?;
        }
        *planned = scratch;
        Ok(Vec::new())
    }

    /// Replay compensating statements for the given forward indices in
    /// reverse. Returns one reason per failed compensation; nothing is
    /// retried.
    fn compensate<S>(&self, rec: &MigrationRecommendation, applied: &[usize], store: &mut S) -> Vec<String>
    where
        S: EntityStore + ?Sized,
    {
        let mut failures = Vec::new();
        for &index in applied.iter().rev() {
            let Some(statement) = rec.rollback.get(index) else {
                failures.push(format!("{} has no compensating statement for step {}", rec.id, index));
                continue;
            };
            match store.execute(statement) {
                Ok(rows) => self.logger.debug(
                    "migration.statement_compensated",
                    &[
                        ("recommendation_id", rec.id.clone()),
                        ("sql", statement.sql.clone()),
                        ("rows", rows.to_string()),
                    ],
                ),
                Err(e) => failures.push(format!("{}: {}", statement.sql, e)),
            }
        }
        failures
    }

    fn rollback<S>(
        &self,
        completed: Vec<Applied<'_>>,
        store: &mut S,
        execution: &mut MigrationExecution,
    ) -> ExecutionStatus
    where
        S: EntityStore + ?Sized,
    {
        self.logger.warn(
            "migration.rollback_started",
            &[
                ("execution_id", execution.id.clone()),
                ("recommendations", completed.len().to_string()),
            ],
        );
        let mut clean = execution.unrecoverable_errors().is_empty();
        for applied in completed.iter().rev() {
            let failures = self.compensate(applied.rec, &applied.statements, store);
            if failures.is_empty() {
                execution.results[applied.result_index].rollback();
                execution.rolled_back.push(applied.rec.id.clone());
            } else {
                clean = false;
                for reason in failures {
                    self.push_rollback_error(execution, applied.rec, applied.batch_id, reason);
                }
            }
        }

        if clean {
            ExecutionStatus::RolledBack
        } else {
            ExecutionStatus::Failed
        }
    }

    fn push_rollback_error(
        &self,
        execution: &mut MigrationExecution,
        rec: &MigrationRecommendation,
        batch_id: &str,
        reason: String,
    ) {
        let err = MigrationError::RollbackFailed { reason };
        self.logger.error(
            "migration.rollback_failed",
            &[
                ("execution_id", execution.id.clone()),
                ("recommendation_id", rec.id.clone()),
                ("error", err.to_string()),
            ],
        );
        execution
            .errors
            .push(ExecutionError::new(ExecutionPhase::Rollback, err.to_string()).at(&rec.id, batch_id));
    }
}

/// Fail the item when any check does not hold.
fn require<R>(
    checks: &[ValidationCheck],
    reader: &R,
    stage: &str,
    result: &mut ExecutionResult,
    applied: &[usize],
) -> Result<(), ItemFailure>
where
    R: EntityReader + ?Sized,
{
    let failures = failed_checks(checks, reader);
    if failures.is_empty() {
        return Ok(());
    }
    let message = format!("{} failed: {}", stage, failures.join(", "));
    result.validation_failures.extend(failures);
    Err(ItemFailure {
        message,
        applied: applied.to_vec(),
    })
}

fn failed_checks<R>(checks: &[ValidationCheck], reader: &R) -> Vec<String>
where
    R: EntityReader + ?Sized,
{
    let mut failures = Vec::new();
    for check in checks {
        match check.evaluate(reader) {
            Ok(true) => {}
            Ok(false) => failures.push(check.to_string()),
            Err(e) => failures.push(format!("{} ({})", check, e)),
        }
    }
    failures
}
