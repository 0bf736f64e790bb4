//! Compliance validation.
//!
//! The validator walks each entity through four layers (entity tags,
//! translations, forms, cross-references), then checks building-block
//! completeness and counts out-of-scope content. Issues and reports are
//! rebuilt on every run.
//!
//! # Example
//!
//! ```ignore
//! let mut validator = ComplianceValidator::new(RuleCatalog::default(), ValidatorConfig::default(), logger)?;
//! let mut cache = LookupCache::new();
//! let report = validator.validate_system(&store, &mut cache)?;
//! println!("mean score {:.1}, ready: {}", report.mean_score, report.readiness.ready);
//! ```

mod issue;
mod report;
mod validator;

pub use issue::{AutoFix, ComplianceIssue, IssueLayer, IssueTarget, Severity};
pub use report::{
    compliance_score, compliance_status, migration_readiness, BuildingBlockReport,
    ComplianceStatus, DeprecatedContentReport, EntityComplianceReport, EntityLoadError,
    FormWarning, IssueCounts, ReadinessVerdict, StatusDistribution, SystemComplianceReport,
    TopIssue,
};
pub use validator::{ComplianceValidator, ValidatorConfig};
