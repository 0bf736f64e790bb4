//! Recommendation types.

use super::statement::Statement;
use crate::compliance::{IssueTarget, Severity};
use crate::migration::ValidationCheck;
use serde::{Deserialize, Serialize};

/// How much care a recommendation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyLevel {
    /// Deterministic, reversible.
    Safe,
    /// Reversible, but based on a heuristic.
    Caution,
    /// Needs a human; nothing is executed automatically.
    ManualReview,
}

impl SafetyLevel {
    /// Estimated automated execution time in seconds.
    pub fn estimated_secs(&self) -> u64 {
        match self {
            SafetyLevel::Safe => 2,
            SafetyLevel::Caution => 5,
            SafetyLevel::ManualReview => 0,
        }
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyLevel::Safe => write!(f, "safe"),
            SafetyLevel::Caution => write!(f, "caution"),
            SafetyLevel::ManualReview => write!(f, "manual-review"),
        }
    }
}

/// What kind of change a recommendation makes. Each category maps to one
/// batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationCategory {
    /// Legacy-to-canonical term replacement.
    Terminology,
    /// Auxiliary metadata and role tags.
    AuxiliaryAssignment,
    /// Classification and marker tags.
    TagStandardization,
    /// Translation/form reference repair.
    CrossReference,
    /// Human review.
    ManualReview,
}

impl RecommendationCategory {
    /// Batch execution sequence.
    pub const ORDER: [RecommendationCategory; 5] = [
        RecommendationCategory::Terminology,
        RecommendationCategory::AuxiliaryAssignment,
        RecommendationCategory::TagStandardization,
        RecommendationCategory::CrossReference,
        RecommendationCategory::ManualReview,
    ];

    /// Batch id.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::Terminology => "terminology",
            RecommendationCategory::AuxiliaryAssignment => "auxiliary-assignment",
            RecommendationCategory::TagStandardization => "tag-standardization",
            RecommendationCategory::CrossReference => "cross-reference",
            RecommendationCategory::ManualReview => "manual-review",
        }
    }

    /// Batch display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            RecommendationCategory::Terminology => "Terminology migration",
            RecommendationCategory::AuxiliaryAssignment => "Auxiliary assignment",
            RecommendationCategory::TagStandardization => "Tag standardization",
            RecommendationCategory::CrossReference => "Cross-reference fixes",
            RecommendationCategory::ManualReview => "Manual review",
        }
    }

    /// Categories whose batches must complete first.
    pub fn dependencies(&self) -> &'static [RecommendationCategory] {
        match self {
            RecommendationCategory::CrossReference => &[
                RecommendationCategory::Terminology,
                RecommendationCategory::AuxiliaryAssignment,
            ],
            _ => &[],
        }
    }
}

impl std::fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executable (or manual-review) remediation for one issue.
///
/// `rollback[i]` compensates `forward[i]`; the executor only replays the
/// compensation for statements that affected rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecommendation {
    /// Recommendation id, unique within a plan.
    pub id: String,
    /// Rule that produced the issue.
    pub rule_id: String,
    /// Severity of the source issue.
    pub severity: Severity,
    /// Owning entity.
    pub entity_id: String,
    /// Record the change applies to.
    pub target: IssueTarget,
    /// Batch category.
    pub category: RecommendationCategory,
    /// Safety level.
    pub safety: SafetyLevel,
    /// Priority, 1 is most urgent.
    pub priority: u32,
    /// What the change does.
    pub description: String,
    /// Statements to apply.
    pub forward: Vec<Statement>,
    /// Compensating statements, aligned with `forward`.
    pub rollback: Vec<Statement>,
    /// Checks that must hold before applying.
    pub pre_checks: Vec<ValidationCheck>,
    /// Checks that must hold after applying.
    pub post_checks: Vec<ValidationCheck>,
    /// Run the item checks even when validation is skipped.
    pub validation_required: bool,
    /// Steps for a human.
    pub manual_steps: Vec<String>,
    /// Estimated automated execution time in seconds.
    pub estimated_secs: u64,
}

impl MigrationRecommendation {
    /// Create a recommendation with no statements.
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        entity_id: impl Into<String>,
        target: IssueTarget,
        category: RecommendationCategory,
        safety: SafetyLevel,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            rule_id: rule_id.into(),
            severity,
            entity_id: entity_id.into(),
            target,
            category,
            safety,
            priority: severity.priority(),
            description: description.into(),
            forward: Vec::new(),
            rollback: Vec::new(),
            pre_checks: Vec::new(),
            post_checks: Vec::new(),
            validation_required: safety == SafetyLevel::Caution,
            manual_steps: Vec::new(),
            estimated_secs: safety.estimated_secs(),
        }
    }

    /// Add a statement and its compensation.
    pub fn with_step(mut self, forward: Statement, rollback: Statement) -> Self {
        self.forward.push(forward);
        self.rollback.push(rollback);
        self
    }

    /// Add a statement with its derived inverse as compensation.
    pub fn with_reversible(self, forward: Statement) -> Self {
        match forward.inverse() {
            Some(inverse) => self.with_step(forward, inverse),
            None => self,
        }
    }

    /// Add a pre-check.
    pub fn with_pre_check(mut self, check: ValidationCheck) -> Self {
        self.pre_checks.push(check);
        self
    }

    /// Add a post-check.
    pub fn with_post_check(mut self, check: ValidationCheck) -> Self {
        self.post_checks.push(check);
        self
    }

    /// Add manual steps.
    pub fn with_manual_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manual_steps.extend(steps.into_iter().map(Into::into));
        self
    }

    /// Whether there is anything to execute.
    pub fn is_executable(&self) -> bool {
        self.safety != SafetyLevel::ManualReview && !self.forward.is_empty()
    }
}
