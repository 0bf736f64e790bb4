//! Lexis command-line interface.
//!
//! Validates a dataset file against a rule catalog, plans the migration,
//! and executes it against an in-memory copy of the dataset.

mod commands;
mod config;
mod error;
mod formatter;

use clap::Parser;
use config::{Args, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Logs go to stderr so stdout stays parseable with --format json.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexis=info,lexis_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Validate(common) => commands::validate(&common.into_config()),
        Command::Terminology(common) => commands::terminology(&common.into_config()),
        Command::Plan(common) => commands::plan(&common.into_config()),
        Command::Migrate { common, migrate } => {
            commands::migrate(&common.into_config(), &migrate.into_config())
        }
    };

    match result {
        Ok(outcome) => {
            println!("{}", outcome.output);
            if !outcome.success {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
