//! Entity and system compliance reports.

use super::issue::{ComplianceIssue, Severity};
use crate::catalog::{rules, ScoringRules};
use crate::store::current_timestamp;
use crate::terminology::ConsistencyWarning;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Per-severity issue counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    /// Critical issues.
    pub critical: usize,
    /// High issues.
    pub high: usize,
    /// Medium issues.
    pub medium: usize,
    /// Low issues.
    pub low: usize,
}

impl IssueCounts {
    /// Count issues by severity.
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a ComplianceIssue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    /// Total issues.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    /// Weighted issue count used by the score.
    pub fn weighted(&self) -> u32 {
        (self.critical as u32) * Severity::Critical.weight()
            + (self.high as u32) * Severity::High.weight()
            + (self.medium as u32) * Severity::Medium.weight()
            + (self.low as u32) * Severity::Low.weight()
    }
}

/// Compliance status of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    /// No issues.
    Compliant,
    /// Some non-blocking issues.
    NeedsWork,
    /// Too many high-severity issues.
    CriticalIssues,
    /// At least one critical issue.
    BlocksMigration,
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "compliant"),
            ComplianceStatus::NeedsWork => write!(f, "needs-work"),
            ComplianceStatus::CriticalIssues => write!(f, "critical-issues"),
            ComplianceStatus::BlocksMigration => write!(f, "blocks-migration"),
        }
    }
}

/// Score in `0..=100`.
pub fn compliance_score(counts: &IssueCounts, scoring: &ScoringRules) -> u8 {
    let budget = f64::from(scoring.max_issue_budget.max(1));
    let weighted = f64::from(counts.weighted());
    let score = (100.0 * (budget - weighted) / budget).round();
    score.clamp(0.0, 100.0) as u8
}

/// Status from issue counts.
pub fn compliance_status(counts: &IssueCounts, scoring: &ScoringRules) -> ComplianceStatus {
    if counts.critical > 0 {
        ComplianceStatus::BlocksMigration
    } else if counts.high > scoring.critical_issues_high_threshold {
        ComplianceStatus::CriticalIssues
    } else if counts.total() > 0 {
        ComplianceStatus::NeedsWork
    } else {
        ComplianceStatus::Compliant
    }
}

/// Whether an entity with these counts may be migrated.
pub fn migration_readiness(counts: &IssueCounts, scoring: &ScoringRules) -> bool {
    counts.critical == 0 && counts.high <= scoring.readiness_max_high
}

/// Structural gaps in an entity's form set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildingBlockReport {
    /// Base forms that are missing, by name.
    pub missing_base_forms: Vec<String>,
    /// Required combinations that are missing, by name.
    pub missing_combinations: Vec<String>,
}

impl BuildingBlockReport {
    /// Whether nothing is missing.
    pub fn is_complete(&self) -> bool {
        self.missing_base_forms.is_empty() && self.missing_combinations.is_empty()
    }
}

/// Out-of-scope content found on an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeprecatedContentReport {
    /// Matches per pattern name.
    pub counts: BTreeMap<String, usize>,
    /// Matching form ids.
    pub form_ids: Vec<String>,
}

impl DeprecatedContentReport {
    /// Record a match.
    pub fn record(&mut self, pattern: &str, form_id: &str) {
        *self.counts.entry(pattern.to_string()).or_default() += 1;
        self.form_ids.push(form_id.to_string());
    }

    /// Total matches.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// A terminology consistency warning on one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormWarning {
    /// Form id.
    pub form_id: String,
    /// The warning.
    pub warning: ConsistencyWarning,
}

/// Compliance report for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityComplianceReport {
    /// Entity id.
    pub entity_id: String,
    /// Entity text.
    pub entity_text: String,
    /// Entity-level issues.
    pub entity_issues: Vec<ComplianceIssue>,
    /// Translation-level issues.
    pub translation_issues: Vec<ComplianceIssue>,
    /// Form-level issues.
    pub form_issues: Vec<ComplianceIssue>,
    /// Cross-reference issues.
    pub cross_reference_issues: Vec<ComplianceIssue>,
    /// Severity counts across all layers.
    pub counts: IssueCounts,
    /// Score in `0..=100`.
    pub score: u8,
    /// Status.
    pub status: ComplianceStatus,
    /// Whether the entity may be migrated.
    pub migration_ready: bool,
    /// Building-block completeness, when checked.
    pub building_blocks: Option<BuildingBlockReport>,
    /// Out-of-scope content, when detected.
    pub deprecated: Option<DeprecatedContentReport>,
    /// Terminology consistency warnings.
    pub terminology_warnings: Vec<FormWarning>,
    /// Contextual notes.
    pub notes: Vec<String>,
    /// When the report was produced (microseconds since epoch).
    pub validated_at: u64,
}

impl EntityComplianceReport {
    /// Create an empty report.
    pub fn new(entity_id: impl Into<String>, entity_text: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_text: entity_text.into(),
            entity_issues: Vec::new(),
            translation_issues: Vec::new(),
            form_issues: Vec::new(),
            cross_reference_issues: Vec::new(),
            counts: IssueCounts::default(),
            score: 100,
            status: ComplianceStatus::Compliant,
            migration_ready: true,
            building_blocks: None,
            deprecated: None,
            terminology_warnings: Vec::new(),
            notes: Vec::new(),
            validated_at: current_timestamp(),
        }
    }

    /// Recompute counts, score, status and readiness from the issue lists.
    pub fn finalize(&mut self, scoring: &ScoringRules) {
        self.counts = IssueCounts::from_issues(self.issues());
        self.score = compliance_score(&self.counts, scoring);
        self.status = compliance_status(&self.counts, scoring);
        self.migration_ready = migration_readiness(&self.counts, scoring);
    }

    /// All issues, layer by layer.
    pub fn issues(&self) -> impl Iterator<Item = &ComplianceIssue> {
        self.entity_issues
            .iter()
            .chain(self.translation_issues.iter())
            .chain(self.form_issues.iter())
            .chain(self.cross_reference_issues.iter())
    }

    /// Issues with an auto-fix.
    pub fn auto_fixable(&self) -> Vec<&ComplianceIssue> {
        self.issues().filter(|i| i.is_auto_fixable()).collect()
    }

    /// Issues that need a human.
    pub fn manual_only(&self) -> Vec<&ComplianceIssue> {
        self.issues().filter(|i| !i.is_auto_fixable()).collect()
    }

    /// Total issue count.
    pub fn issue_count(&self) -> usize {
        self.counts.total()
    }
}

/// Entities per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    /// Compliant entities.
    pub compliant: usize,
    /// Entities needing work.
    pub needs_work: usize,
    /// Entities with critical issues.
    pub critical_issues: usize,
    /// Entities blocking migration.
    pub blocks_migration: usize,
}

impl StatusDistribution {
    fn add(&mut self, status: ComplianceStatus) {
        match status {
            ComplianceStatus::Compliant => self.compliant += 1,
            ComplianceStatus::NeedsWork => self.needs_work += 1,
            ComplianceStatus::CriticalIssues => self.critical_issues += 1,
            ComplianceStatus::BlocksMigration => self.blocks_migration += 1,
        }
    }

    /// Count for one status.
    pub fn get(&self, status: ComplianceStatus) -> usize {
        match status {
            ComplianceStatus::Compliant => self.compliant,
            ComplianceStatus::NeedsWork => self.needs_work,
            ComplianceStatus::CriticalIssues => self.critical_issues,
            ComplianceStatus::BlocksMigration => self.blocks_migration,
        }
    }
}

/// A frequently violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopIssue {
    /// Rule id.
    pub rule_id: String,
    /// Occurrences.
    pub count: usize,
    /// Impact description.
    pub impact: String,
}

/// System-level readiness verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessVerdict {
    /// Whether the system may be migrated.
    pub ready: bool,
    /// Reasons it may not.
    pub blockers: Vec<String>,
    /// Suggested next steps.
    pub recommendations: Vec<String>,
}

/// An entity that could not be validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityLoadError {
    /// Entity id.
    pub entity_id: String,
    /// Error message.
    pub message: String,
}

/// Aggregate report over all entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemComplianceReport {
    /// Entities validated.
    pub total_entities: usize,
    /// Entities per status.
    pub distribution: StatusDistribution,
    /// Mean score.
    pub mean_score: f64,
    /// Most frequent rule ids.
    pub top_issues: Vec<TopIssue>,
    /// Total issues.
    pub total_issues: usize,
    /// Total auto-fixable issues.
    pub total_auto_fixable: usize,
    /// Readiness verdict.
    pub readiness: ReadinessVerdict,
    /// Entities that failed to load.
    pub errors: Vec<EntityLoadError>,
    /// When the report was produced (microseconds since epoch).
    pub generated_at: u64,
}

impl SystemComplianceReport {
    /// Aggregate entity reports.
    ///
    /// An empty set has a mean score of 100.
    pub fn aggregate(
        reports: &[EntityComplianceReport],
        errors: Vec<EntityLoadError>,
        readiness_threshold: f64,
        top_issue_limit: usize,
    ) -> Self {
        let mut distribution = StatusDistribution::default();
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        let mut total_issues = 0;
        let mut total_auto_fixable = 0;
        let mut score_sum = 0u64;

        for report in reports {
            distribution.add(report.status);
            score_sum += u64::from(report.score);
            for issue in report.issues() {
                total_issues += 1;
                if issue.is_auto_fixable() {
                    total_auto_fixable += 1;
                }
                *frequency.entry(issue.rule_id.as_str()).or_default() += 1;
            }
        }

        let mean_score = if reports.is_empty() {
            100.0
        } else {
            score_sum as f64 / reports.len() as f64
        };

        let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let top_issues: Vec<TopIssue> = ranked
            .into_iter()
            .take(top_issue_limit)
            .map(|(rule_id, count)| TopIssue {
                rule_id: rule_id.to_string(),
                count,
                impact: rules::impact_description(rule_id).to_string(),
            })
            .collect();

        let readiness = verdict(
            &distribution,
            mean_score,
            readiness_threshold,
            total_auto_fixable,
            &top_issues,
            errors.len(),
        );

        Self {
            total_entities: reports.len(),
            distribution,
            mean_score,
            top_issues,
            total_issues,
            total_auto_fixable,
            readiness,
            errors,
            generated_at: current_timestamp(),
        }
    }
}

fn verdict(
    distribution: &StatusDistribution,
    mean_score: f64,
    threshold: f64,
    auto_fixable: usize,
    top_issues: &[TopIssue],
    load_errors: usize,
) -> ReadinessVerdict {
    let mut blockers = Vec::new();
    let mut recommendations = Vec::new();

    if distribution.blocks_migration > 0 {
        blockers.push(format!(
            "{} entities have critical issues that block migration",
            distribution.blocks_migration
        ));
        recommendations.push("Resolve critical issues before migrating".to_string());
    }
    if mean_score < threshold {
        blockers.push(format!(
            "mean compliance score {:.1} is below the threshold {:.1}",
            mean_score, threshold
        ));
    }
    if auto_fixable > 0 {
        recommendations.push(format!(
            "{} issues can be fixed automatically; generate a migration plan",
            auto_fixable
        ));
    }
    if top_issues.iter().any(|t| t.rule_id == rules::LEGACY_TERMINOLOGY) {
        recommendations.push("Run the terminology batch before other fixes".to_string());
    }
    if distribution.critical_issues > 0 {
        recommendations.push(format!(
            "Review {} entities with many high-severity issues",
            distribution.critical_issues
        ));
    }
    if load_errors > 0 {
        recommendations.push(format!(
            "{} entities could not be loaded; check the store",
            load_errors
        ));
    }

    ReadinessVerdict {
        ready: mean_score >= threshold && distribution.blocks_migration == 0,
        blockers,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{IssueLayer, IssueTarget};

    fn counts(critical: usize, high: usize, medium: usize) -> IssueCounts {
        IssueCounts {
            critical,
            high,
            medium,
            low: 0,
        }
    }

    fn issue(rule: &str, severity: Severity) -> ComplianceIssue {
        ComplianceIssue::new(
            rule,
            severity,
            IssueLayer::Form,
            "w1",
            IssueTarget::Form("f1".into()),
            "test",
        )
    }

    #[test]
    fn test_score_formula() {
        let scoring = ScoringRules::default();
        assert_eq!(compliance_score(&counts(0, 0, 0), &scoring), 100);
        assert_eq!(compliance_score(&counts(1, 0, 0), &scoring), 80);
        assert_eq!(compliance_score(&counts(1, 1, 1), &scoring), 65);
        assert_eq!(compliance_score(&counts(5, 0, 0), &scoring), 0);
        assert_eq!(compliance_score(&counts(9, 9, 9), &scoring), 0);
    }

    #[test]
    fn test_score_non_increasing_in_critical() {
        let scoring = ScoringRules::default();
        for high in 0..4 {
            for medium in 0..4 {
                let mut previous = u8::MAX;
                for critical in 0..8 {
                    let score = compliance_score(&counts(critical, high, medium), &scoring);
                    assert!(score <= previous);
                    previous = score;
                }
            }
        }
    }

    #[test]
    fn test_status_thresholds() {
        let scoring = ScoringRules::default();
        assert_eq!(compliance_status(&counts(1, 0, 0), &scoring), ComplianceStatus::BlocksMigration);
        assert_eq!(compliance_status(&counts(0, 3, 0), &scoring), ComplianceStatus::CriticalIssues);
        assert_eq!(compliance_status(&counts(0, 2, 0), &scoring), ComplianceStatus::NeedsWork);
        assert_eq!(compliance_status(&counts(0, 0, 1), &scoring), ComplianceStatus::NeedsWork);
        assert_eq!(compliance_status(&counts(0, 0, 0), &scoring), ComplianceStatus::Compliant);
    }

    #[test]
    fn test_readiness_for_all_combinations() {
        let scoring = ScoringRules::default();
        for critical in 0..4 {
            for high in 0..4 {
                for medium in 0..3 {
                    let ready = migration_readiness(&counts(critical, high, medium), &scoring);
                    assert_eq!(ready, critical == 0 && high <= 1);
                }
            }
        }
    }

    #[test]
    fn test_system_aggregate() {
        let scoring = ScoringRules::default();
        let mut blocked = EntityComplianceReport::new("w1", "a");
        blocked.form_issues.push(
            issue(rules::LEGACY_TERMINOLOGY, Severity::Critical).with_auto_fix(
                crate::compliance::AutoFix::ReplaceTag {
                    from: "lui".into(),
                    to: "terza-persona".into(),
                },
            ),
        );
        blocked.form_issues.push(issue(rules::MISSING_MOOD, Severity::High));
        blocked.finalize(&scoring);

        let mut clean = EntityComplianceReport::new("w2", "b");
        clean.finalize(&scoring);

        let system = SystemComplianceReport::aggregate(&[blocked, clean], Vec::new(), 80.0, 10);
        assert_eq!(system.total_entities, 2);
        assert_eq!(system.distribution.blocks_migration, 1);
        assert_eq!(system.distribution.compliant, 1);
        assert_eq!(system.total_issues, 2);
        assert_eq!(system.total_auto_fixable, 1);
        assert!((system.mean_score - 85.0).abs() < f64::EPSILON);
        assert!(!system.readiness.ready);
        assert_eq!(system.top_issues.len(), 2);
        assert_eq!(
            system.top_issues[0].impact,
            rules::impact_description(system.top_issues[0].rule_id.as_str())
        );
    }

    #[test]
    fn test_empty_system_is_ready() {
        let system = SystemComplianceReport::aggregate(&[], Vec::new(), 80.0, 10);
        assert!(system.readiness.ready);
        assert!(system.top_issues.is_empty());
    }
}
