//! Terminology conversion.
//!
//! Two vocabularies describe the same grammatical concepts: the legacy terms
//! still present in older records and the canonical terms the catalog expects.
//! This module maps between them, checks tag sets for semantic consistency,
//! and measures how far a dataset has migrated.

mod analysis;
mod converter;
pub mod mapping;

pub use analysis::{
    AnalysisConfig, CategoryUsage, MigrationPriority, MixedUsage, TermUsage, TerminologyAnalysis,
};
pub use converter::{
    ConsistencyWarning, ConversionOptions, ConversionResult, TermConversion, TerminologyConverter,
};
pub use mapping::{TermCategory, TermMapping};
