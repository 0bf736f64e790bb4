//! Output formatters for reports, plans and executions.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use lexis_core::compliance::{ComplianceStatus, SystemComplianceReport};
use lexis_core::migration::MigrationExecution;
use lexis_core::recommendation::MigrationPlan;
use lexis_core::terminology::TerminologyAnalysis;
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a system compliance report.
    fn format_report(&self, report: &SystemComplianceReport) -> String;

    /// Format a terminology analysis.
    fn format_terminology(&self, analysis: &TerminologyAnalysis) -> String;

    /// Format a migration plan.
    fn format_plan(&self, plan: &MigrationPlan) -> String;

    /// Format an execution.
    fn format_execution(&self, execution: &MigrationExecution) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_report(&self, report: &SystemComplianceReport) -> String {
        let mut summary = Table::new();
        summary.set_header(vec!["Status", "Entities"]);
        for status in [
            ComplianceStatus::Compliant,
            ComplianceStatus::NeedsWork,
            ComplianceStatus::CriticalIssues,
            ComplianceStatus::BlocksMigration,
        ] {
            summary.add_row(vec![
                Cell::new(status.to_string()),
                Cell::new(report.distribution.get(status)),
            ]);
        }

        let mut output = format!(
            "{} entities, mean score {:.1}, {} issues ({} auto-fixable)\n{}",
            report.total_entities,
            report.mean_score,
            report.total_issues,
            report.total_auto_fixable,
            summary
        );

        if !report.top_issues.is_empty() {
            let mut top = Table::new();
            top.set_header(vec!["Rule", "Count", "Impact"]);
            for issue in &report.top_issues {
                top.add_row(vec![
                    Cell::new(&issue.rule_id),
                    Cell::new(issue.count),
                    Cell::new(&issue.impact),
                ]);
            }
            output.push_str(&format!("\n\nTop issues\n{}", top));
        }

        for error in &report.errors {
            output.push_str(&format!("\nNot validated: {} ({})", error.entity_id, error.message));
        }

        let verdict = if report.readiness.ready { "ready" } else { "not ready" };
        output.push_str(&format!("\n\nMigration readiness: {}", verdict));
        for blocker in &report.readiness.blockers {
            output.push_str(&format!("\n  - {}", blocker));
        }
        for step in &report.readiness.recommendations {
            output.push_str(&format!("\n  > {}", step));
        }
        output
    }

    fn format_terminology(&self, analysis: &TerminologyAnalysis) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Legacy in use", "Canonical in use", "Mixed"]);
        for usage in &analysis.categories {
            let legacy: Vec<String> = usage
                .legacy_in_use
                .iter()
                .map(|t| format!("{} ({})", t.term, t.count))
                .collect();
            let canonical: Vec<String> = usage
                .canonical_in_use
                .iter()
                .map(|t| format!("{} ({})", t.term, t.count))
                .collect();
            let mixed: Vec<String> = usage
                .mixed_usage
                .iter()
                .map(|m| format!("{} [{}]", m.canonical, m.priority))
                .collect();
            table.add_row(vec![
                usage.category.to_string(),
                legacy.join(", "),
                canonical.join(", "),
                mixed.join(", "),
            ]);
        }
        format!(
            "{} tag sets, {} legacy and {} canonical occurrences\n{}",
            analysis.tag_sets_analyzed, analysis.total_legacy, analysis.total_canonical, table
        )
    }

    fn format_plan(&self, plan: &MigrationPlan) -> String {
        if plan.is_empty() {
            return "Nothing to migrate".to_string();
        }

        let mut batches = Table::new();
        batches.set_header(vec!["Batch", "Recommendations", "Depends on", "Est. seconds"]);
        for batch in &plan.batches {
            batches.add_row(vec![
                Cell::new(&batch.id),
                Cell::new(batch.len()),
                Cell::new(batch.dependencies.join(", ")),
                Cell::new(batch.estimated_secs),
            ]);
        }

        let mut recs = Table::new();
        recs.set_header(vec!["Id", "Rule", "Target", "Safety", "Description"]);
        for rec in plan.recommendations() {
            recs.add_row(vec![
                Cell::new(&rec.id),
                Cell::new(&rec.rule_id),
                Cell::new(format!("{} {}", rec.target.table(), rec.target.id())),
                Cell::new(rec.safety.to_string()),
                Cell::new(&rec.description),
            ]);
        }

        format!(
            "Plan {} (risk {}, digest {})\n{} recommendations: {} safe, {} caution, {} manual review\n{}\n\n{}",
            plan.id,
            plan.risk,
            plan.digest,
            plan.counts.total,
            plan.counts.safe,
            plan.counts.caution,
            plan.counts.manual_review,
            batches,
            recs
        )
    }

    fn format_execution(&self, execution: &MigrationExecution) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Recommendation", "Batch", "Status", "Rows", "Error"]);
        for result in &execution.results {
            table.add_row(vec![
                Cell::new(&result.recommendation_id),
                Cell::new(&result.batch_id),
                Cell::new(result.status.to_string()),
                Cell::new(result.rows_affected),
                Cell::new(result.error.as_deref().unwrap_or("")),
            ]);
        }

        let mode = if execution.dry_run { " (dry run)" } else { "" };
        let mut output = format!(
            "Execution {}{}: {}\n{} applied, {} failed, {} skipped, {} rolled back, {} rows affected\n{}",
            execution.id,
            mode,
            execution.status,
            execution.successful_migrations.len(),
            execution.failed_migrations.len(),
            execution.skipped.len(),
            execution.rolled_back.len(),
            execution.total_rows_affected,
            table
        );
        for warning in &execution.warnings {
            output.push_str(&format!("\nwarning: {}", warning));
        }
        for error in &execution.errors {
            let suffix = if error.recoverable { "" } else { " (not recoverable)" };
            output.push_str(&format!("\n{} error: {}{}", error.phase, error.message, suffix));
        }
        output
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl JsonFormatter {
    fn render<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl Formatter for JsonFormatter {
    fn format_report(&self, report: &SystemComplianceReport) -> String {
        Self::render(report)
    }

    fn format_terminology(&self, analysis: &TerminologyAnalysis) -> String {
        Self::render(analysis)
    }

    fn format_plan(&self, plan: &MigrationPlan) -> String {
        Self::render(plan)
    }

    fn format_execution(&self, execution: &MigrationExecution) -> String {
        Self::render(execution)
    }
}
