//! Compliance issues produced by the validator.

use crate::model::Table;
use serde::{Deserialize, Serialize};

/// Severity of a compliance issue.
///
/// Ordered from most to least severe, so `Critical < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks migration.
    Critical,
    /// Must be fixed before migration.
    High,
    /// Should be fixed.
    Medium,
    /// Cosmetic.
    Low,
}

impl Severity {
    /// Weight used by the compliance score.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 4,
            Severity::High => 2,
            Severity::Medium => 1,
            Severity::Low => 0,
        }
    }

    /// Priority of recommendations derived from an issue of this severity.
    pub fn priority(&self) -> u32 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

/// Which validation layer raised an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueLayer {
    /// Entity tags.
    Entity,
    /// Translation metadata and references.
    Translation,
    /// Form tags.
    Form,
    /// References between translations and forms.
    CrossReference,
}

/// The record an issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum IssueTarget {
    /// An entity row.
    Entity(String),
    /// A translation row.
    Translation(String),
    /// A form row.
    Form(String),
}

impl IssueTarget {
    /// Row id.
    pub fn id(&self) -> &str {
        match self {
            IssueTarget::Entity(id) | IssueTarget::Translation(id) | IssueTarget::Form(id) => id,
        }
    }

    /// Backing table.
    pub fn table(&self) -> Table {
        match self {
            IssueTarget::Entity(_) => Table::Words,
            IssueTarget::Translation(_) => Table::WordTranslations,
            IssueTarget::Form(_) => Table::WordForms,
        }
    }
}

/// A deterministic fix the validator can already describe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AutoFix {
    /// Add a tag to the target.
    AddTag {
        /// Tag to add.
        tag: String,
    },
    /// Remove a tag from the target.
    RemoveTag {
        /// Tag to remove.
        tag: String,
    },
    /// Replace one tag with another.
    ReplaceTag {
        /// Current tag.
        from: String,
        /// Replacement tag.
        to: String,
    },
    /// Set a context metadata value.
    SetMetadata {
        /// Metadata key.
        key: String,
        /// New value.
        value: String,
    },
    /// Drop a form id from a translation's references.
    RemoveFormReference {
        /// Dangling form id.
        form_id: String,
    },
}

impl std::fmt::Display for AutoFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoFix::AddTag { tag } => write!(f, "add tag '{}'", tag),
            AutoFix::RemoveTag { tag } => write!(f, "remove tag '{}'", tag),
            AutoFix::ReplaceTag { from, to } => write!(f, "replace tag '{}' with '{}'", from, to),
            AutoFix::SetMetadata { key, value } => write!(f, "set {} = '{}'", key, value),
            AutoFix::RemoveFormReference { form_id } => {
                write!(f, "remove form reference '{}'", form_id)
            }
        }
    }
}

/// A detected rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceIssue {
    /// Rule that was violated.
    pub rule_id: String,
    /// Severity.
    pub severity: Severity,
    /// Layer that raised the issue.
    pub layer: IssueLayer,
    /// Owning entity.
    pub entity_id: String,
    /// Record the issue is about.
    pub target: IssueTarget,
    /// Human-readable message.
    pub message: String,
    /// What the record holds now.
    pub current_value: Option<String>,
    /// What the rule expects.
    pub expected_value: Option<String>,
    /// Deterministic fix, if one exists.
    pub auto_fix: Option<AutoFix>,
    /// Steps for a human when no auto-fix exists.
    pub manual_steps: Vec<String>,
    /// Contextual note.
    pub context: Option<String>,
}

impl ComplianceIssue {
    /// Create a new issue.
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        layer: IssueLayer,
        entity_id: impl Into<String>,
        target: IssueTarget,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            layer,
            entity_id: entity_id.into(),
            target,
            message: message.into(),
            current_value: None,
            expected_value: None,
            auto_fix: None,
            manual_steps: Vec::new(),
            context: None,
        }
    }

    /// Record the current value.
    pub fn with_current(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }

    /// Record the expected value.
    pub fn with_expected(mut self, value: impl Into<String>) -> Self {
        self.expected_value = Some(value.into());
        self
    }

    /// Attach an auto-fix.
    pub fn with_auto_fix(mut self, fix: AutoFix) -> Self {
        self.auto_fix = Some(fix);
        self
    }

    /// Attach a manual step.
    pub fn with_manual_step(mut self, step: impl Into<String>) -> Self {
        self.manual_steps.push(step.into());
        self
    }

    /// Attach a contextual note.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether the issue can be fixed without a human.
    pub fn is_auto_fixable(&self) -> bool {
        self.auto_fix.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering_and_weights() {
        assert!(Severity::Critical < Severity::High);
        assert!(Severity::Medium < Severity::Low);
        assert_eq!(Severity::Critical.weight(), 4);
        assert_eq!(Severity::High.weight(), 2);
        assert_eq!(Severity::Medium.weight(), 1);
        assert_eq!(Severity::Low.weight(), 0);
    }

    #[test]
    fn test_issue_builder() {
        let issue = ComplianceIssue::new(
            "legacy-terminology",
            Severity::Critical,
            IssueLayer::Form,
            "w1",
            IssueTarget::Form("f1".into()),
            "legacy term 'lui'",
        )
        .with_current("lui")
        .with_expected("terza-persona")
        .with_auto_fix(AutoFix::ReplaceTag {
            from: "lui".into(),
            to: "terza-persona".into(),
        });

        assert!(issue.is_auto_fixable());
        assert_eq!(issue.target.table(), Table::WordForms);
        assert_eq!(
            issue.auto_fix.unwrap().to_string(),
            "replace tag 'lui' with 'terza-persona'"
        );
    }
}
