//! Subcommand implementations.

use crate::config::{MigrateConfig, RunConfig};
use crate::error::Error;
use crate::formatter::create_formatter;
use lexis_core::compliance::SystemComplianceReport;
use lexis_core::migration::{ExecutionHistoryStore, ExecutionStatus, MigrationExecution, MigrationExecutor};
use lexis_core::recommendation::MigrationPlan;
use lexis_core::terminology::{AnalysisConfig, TerminologyAnalysis};
use lexis_core::{
    ComplianceValidator, Dataset, LookupCache, MemoryStore, RecommendationEngine, RuleCatalog,
    SharedLogger, TracingLogger, ValidatorConfig,
};
use std::sync::Arc;

/// Output of a subcommand.
#[derive(Debug)]
pub struct Outcome {
    /// Rendered output.
    pub output: String,
    /// Whether the process should exit successfully.
    pub success: bool,
}

impl Outcome {
    fn ok(output: String) -> Self {
        Self { output, success: true }
    }
}

/// Loaded inputs for one run.
struct Session {
    store: MemoryStore,
    catalog: RuleCatalog,
    logger: SharedLogger,
}

impl Session {
    fn load(config: &RunConfig) -> Result<Self, Error> {
        let dataset = Dataset::load(&config.dataset)?;
        let catalog = match &config.catalog {
            Some(path) => RuleCatalog::load(path)?,
            None => RuleCatalog::default(),
        };
        tracing::info!(
            dataset = %config.dataset.display(),
            entities = dataset.bundles.len(),
            catalog_version = catalog.version,
            "inputs loaded"
        );
        Ok(Self {
            store: MemoryStore::new(dataset),
            catalog,
            logger: Arc::new(TracingLogger),
        })
    }

    fn validate(&self) -> Result<(ComplianceValidator, SystemComplianceReport), Error> {
        let mut validator = ComplianceValidator::new(
            self.catalog.clone(),
            ValidatorConfig::default(),
            self.logger.clone(),
        )?;
        let report = validator.validate_system(&self.store, &mut LookupCache::new())?;
        Ok((validator, report))
    }

    fn plan(&self) -> Result<MigrationPlan, Error> {
        let (validator, _) = self.validate()?;
        let engine = RecommendationEngine::new(self.catalog.clone(), self.logger.clone());
        Ok(engine.create_plan(validator.results()))
    }
}

/// `validate`: system compliance report.
pub fn validate(config: &RunConfig) -> Result<Outcome, Error> {
    let session = Session::load(config)?;
    let (_, report) = session.validate()?;
    let output = create_formatter(config.format).format_report(&report);
    Ok(Outcome {
        output,
        success: report.errors.is_empty(),
    })
}

/// `terminology`: legacy and canonical usage across every form.
pub fn terminology(config: &RunConfig) -> Result<Outcome, Error> {
    let session = Session::load(config)?;
    let dataset = session.store.dataset();
    let tag_sets = dataset
        .bundles
        .iter()
        .flat_map(|b| b.forms.iter())
        .map(|f| f.tags.as_slice());
    let analysis = TerminologyAnalysis::from_tag_sets(tag_sets, &AnalysisConfig::default());
    Ok(Outcome::ok(create_formatter(config.format).format_terminology(&analysis)))
}

/// `plan`: migration plan for the current validation results.
pub fn plan(config: &RunConfig) -> Result<Outcome, Error> {
    let session = Session::load(config)?;
    let plan = session.plan()?;
    Ok(Outcome::ok(create_formatter(config.format).format_plan(&plan)))
}

/// `migrate`: plan and execute, then optionally write the result.
pub fn migrate(config: &RunConfig, migrate: &MigrateConfig) -> Result<Outcome, Error> {
    let mut session = Session::load(config)?;
    let plan = session.plan()?;

    let mut executor = MigrationExecutor::new(session.logger.clone());
    if let Some(dir) = &migrate.history {
        let db = sled::open(dir)?;
        executor = executor.with_history_store(ExecutionHistoryStore::open(&db)?);
    }
    let execution = executor.execute(&plan, &mut session.store, &migrate.options)?;

    if let Some(path) = &migrate.output {
        if execution.dry_run {
            tracing::warn!(output = %path.display(), "dry run, dataset not written");
        } else {
            session.store.dataset().save(path)?;
            tracing::info!(output = %path.display(), "migrated dataset written");
        }
    }

    Ok(Outcome {
        output: create_formatter(config.format).format_execution(&execution),
        success: migrated(&execution),
    })
}

/// Whether every executable recommendation went through.
fn migrated(execution: &MigrationExecution) -> bool {
    execution.failed_migrations.is_empty()
        && matches!(
            execution.status,
            ExecutionStatus::Completed | ExecutionStatus::CompletedWithWarnings
        )
}
