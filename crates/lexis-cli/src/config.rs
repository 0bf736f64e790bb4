//! Command-line arguments.

use crate::formatter::OutputFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};
use lexis_core::migration::ExecutionOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Default pause between batches, in milliseconds.
pub const DEFAULT_BATCH_DELAY_MS: u64 = 100;

/// Lexis - compliance auditing and migration for lexical datasets
#[derive(Parser, Debug)]
#[command(name = "lexis")]
#[command(version, about = "Compliance auditing and migration for tagged lexical datasets")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate every entity and print the system report
    Validate(CommonArgs),

    /// Analyze legacy and canonical terminology usage
    Terminology(CommonArgs),

    /// Build a migration plan from the validation results
    Plan(CommonArgs),

    /// Build and execute a migration plan
    Migrate {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        migrate: MigrateArgs,
    },
}

/// Arguments shared by every subcommand.
#[derive(ClapArgs, Debug, Clone)]
pub struct CommonArgs {
    /// Dataset file (JSON)
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Rule catalog file (JSON); the built-in catalog is used when omitted
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

/// Arguments for `migrate`.
#[derive(ClapArgs, Debug, Clone)]
pub struct MigrateArgs {
    /// Run checks and print statements without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep going after a failed recommendation instead of rolling back
    #[arg(long)]
    pub continue_on_error: bool,

    /// Skip plan-level pre-checks and success criteria
    #[arg(long)]
    pub skip_validation: bool,

    /// Pause between batches in milliseconds
    #[arg(long, default_value_t = DEFAULT_BATCH_DELAY_MS)]
    pub batch_delay_ms: u64,

    /// Write the migrated dataset to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory of the execution history database
    #[arg(long)]
    pub history: Option<PathBuf>,
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Dataset file.
    pub dataset: PathBuf,
    /// Rule catalog file.
    pub catalog: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
}

/// Resolved configuration for `migrate`.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Executor options.
    pub options: ExecutionOptions,
    /// Where to write the migrated dataset.
    pub output: Option<PathBuf>,
    /// Execution history database.
    pub history: Option<PathBuf>,
}

impl CommonArgs {
    /// Convert to a run configuration.
    pub fn into_config(self) -> RunConfig {
        RunConfig {
            dataset: self.dataset,
            catalog: self.catalog,
            format: self.format,
        }
    }
}

impl MigrateArgs {
    /// Convert to a migrate configuration.
    pub fn into_config(self) -> MigrateConfig {
        let options = ExecutionOptions::default()
            .with_dry_run(self.dry_run)
            .with_stop_on_error(!self.continue_on_error)
            .with_skip_validation(self.skip_validation)
            .with_batch_delay(Duration::from_millis(self.batch_delay_ms));
        MigrateConfig {
            options,
            output: self.output,
            history: self.history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_defaults() {
        let args = Args::parse_from(["lexis", "migrate", "--dataset", "words.json"]);
        let Command::Migrate { common, migrate } = args.command else {
            panic!("expected migrate");
        };
        assert_eq!(common.format, OutputFormat::Table);
        let config = migrate.into_config();
        assert!(!config.options.dry_run);
        assert!(config.options.stop_on_error);
        assert!(!config.options.skip_validation);
        assert_eq!(config.options.batch_delay, Duration::from_millis(100));
        assert!(config.output.is_none());
    }

    #[test]
    fn test_migrate_flags() {
        let args = Args::parse_from([
            "lexis",
            "migrate",
            "-d",
            "words.json",
            "--format",
            "json",
            "--dry-run",
            "--continue-on-error",
            "--skip-validation",
            "--batch-delay-ms",
            "0",
            "--output",
            "out.json",
        ]);
        let Command::Migrate { common, migrate } = args.command else {
            panic!("expected migrate");
        };
        assert_eq!(common.into_config().format, OutputFormat::Json);
        let config = migrate.into_config();
        assert!(config.options.dry_run);
        assert!(!config.options.stop_on_error);
        assert!(config.options.skip_validation);
        assert!(config.options.batch_delay.is_zero());
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_catalog_is_optional() {
        let args = Args::parse_from(["lexis", "validate", "--dataset", "words.json"]);
        let Command::Validate(common) = args.command else {
            panic!("expected validate");
        };
        assert!(common.catalog.is_none());
    }
}
