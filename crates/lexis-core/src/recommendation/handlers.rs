//! Issue-to-recommendation handlers.
//!
//! Each handler is a pure function of the issue and the catalog. Handlers
//! only template statements from the issue's auto-fix and target; anything
//! they cannot express safely becomes a manual-review recommendation.

use super::statement::StatementBuilder;
use super::types::{MigrationRecommendation, RecommendationCategory, SafetyLevel};
use crate::catalog::{rules, RuleCatalog};
use crate::compliance::{AutoFix, ComplianceIssue, IssueTarget};
use crate::migration::ValidationCheck;
use crate::model::{Column, Table};
use std::collections::HashMap;

/// Inputs shared by every handler.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Catalog the issues were produced with.
    pub catalog: &'a RuleCatalog,
}

/// A recommendation handler.
pub type Handler = fn(&ComplianceIssue, &HandlerContext<'_>) -> MigrationRecommendation;

/// Handlers keyed by rule id.
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    /// Create an empty registry. Every issue falls back to manual review.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the rule.
    pub fn register(&mut self, rule_id: impl Into<String>, handler: Handler) {
        self.handlers.insert(rule_id.into(), handler);
    }

    /// Whether a rule has a dedicated handler.
    pub fn handles(&self, rule_id: &str) -> bool {
        self.handlers.contains_key(rule_id)
    }

    /// Build the recommendation for an issue.
    pub fn dispatch(&self, issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
        match self.handlers.get(&issue.rule_id) {
            Some(handler) => handler(issue, ctx),
            None => manual_review(issue, ctx),
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(rules::LEGACY_TERMINOLOGY, legacy_terminology);
        registry.register(rules::MISSING_CONJUGATION_CLASS, missing_classification);
        registry.register(rules::MISSING_AUXILIARY, missing_auxiliary);
        registry.register(rules::MISSING_AUXILIARY_TAG, missing_auxiliary_tag);
        registry.register(rules::MISSING_BUILDING_BLOCK_TAG, missing_building_block_tag);
        registry.register(rules::ORPHANED_FORM_REFERENCE, orphaned_form_reference);
        registry.register(rules::AUXILIARY_MISMATCH, auxiliary_mismatch);
        registry
    }
}

fn recommendation(
    issue: &ComplianceIssue,
    category: RecommendationCategory,
    safety: SafetyLevel,
    description: String,
) -> MigrationRecommendation {
    MigrationRecommendation::new(
        issue.rule_id.clone(),
        issue.severity,
        issue.entity_id.clone(),
        issue.target.clone(),
        category,
        safety,
        description,
    )
}

/// Fallback for issues that need linguistic judgment.
pub fn manual_review(issue: &ComplianceIssue, _ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let steps = if issue.manual_steps.is_empty() {
        vec![format!("Review {} {}", issue.target.table(), issue.target.id())]
    } else {
        issue.manual_steps.clone()
    };
    recommendation(
        issue,
        RecommendationCategory::ManualReview,
        SafetyLevel::ManualReview,
        issue.message.clone(),
    )
    .with_manual_steps(steps)
}

fn legacy_terminology(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let IssueTarget::Form(form_id) = &issue.target else {
        return manual_review(issue, ctx);
    };
    let mut rec = match &issue.auto_fix {
        Some(AutoFix::ReplaceTag { from, to }) => recommendation(
            issue,
            RecommendationCategory::Terminology,
            SafetyLevel::Safe,
            format!("Replace legacy tag '{}' with '{}' on form {}", from, to, form_id),
        )
        .with_reversible(StatementBuilder::array_replace(
            Table::WordForms,
            Column::Tags,
            form_id,
            from,
            to,
        ))
        .with_pre_check(ValidationCheck::FormHasTag {
            form_id: form_id.clone(),
            tag: from.clone(),
        })
        .with_post_check(ValidationCheck::FormLacksTag {
            form_id: form_id.clone(),
            tag: from.clone(),
        })
        .with_post_check(ValidationCheck::FormHasTag {
            form_id: form_id.clone(),
            tag: to.clone(),
        }),
        // The canonical term is already there, or another source provides it.
        Some(AutoFix::RemoveTag { tag }) => recommendation(
            issue,
            RecommendationCategory::Terminology,
            SafetyLevel::Safe,
            format!("Drop legacy tag '{}' from form {}", tag, form_id),
        )
        .with_reversible(StatementBuilder::array_remove(
            Table::WordForms,
            Column::Tags,
            form_id,
            tag,
        ))
        .with_pre_check(ValidationCheck::FormHasTag {
            form_id: form_id.clone(),
            tag: tag.clone(),
        })
        .with_post_check(ValidationCheck::FormLacksTag {
            form_id: form_id.clone(),
            tag: tag.clone(),
        }),
        _ => return manual_review(issue, ctx),
    };
    rec.validation_required = false;
    rec
}

fn missing_classification(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let (IssueTarget::Entity(entity_id), Some(AutoFix::AddTag { tag })) = (&issue.target, &issue.auto_fix)
    else {
        return manual_review(issue, ctx);
    };
    recommendation(
        issue,
        RecommendationCategory::TagStandardization,
        SafetyLevel::Caution,
        format!("Add inferred classification '{}' to entity {}", tag, entity_id),
    )
    .with_reversible(StatementBuilder::array_append(Table::Words, Column::Tags, entity_id, tag))
    .with_pre_check(ValidationCheck::EntityExists {
        entity_id: entity_id.clone(),
    })
    .with_post_check(ValidationCheck::EntityHasTag {
        entity_id: entity_id.clone(),
        tag: tag.clone(),
    })
}

fn missing_auxiliary(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let (IssueTarget::Translation(translation_id), Some(AutoFix::SetMetadata { key, value })) =
        (&issue.target, &issue.auto_fix)
    else {
        return manual_review(issue, ctx);
    };
    if !ctx.catalog.translation.allowed_values.contains(value) {
        return manual_review(issue, ctx);
    }
    let mut rec = recommendation(
        issue,
        RecommendationCategory::AuxiliaryAssignment,
        SafetyLevel::Caution,
        format!("Set {} = '{}' on translation {}", key, value, translation_id),
    )
    .with_step(
        StatementBuilder::metadata_merge(translation_id, key.clone(), value.clone()),
        StatementBuilder::metadata_remove(translation_id, key.clone()),
    )
    .with_pre_check(ValidationCheck::TranslationExists {
        translation_id: translation_id.clone(),
    })
    .with_post_check(ValidationCheck::TranslationHasMetadata {
        translation_id: translation_id.clone(),
        key: key.clone(),
        value: Some(value.clone()),
    });
    if let Some(note) = &issue.context {
        rec.manual_steps.push(format!("Confirm the auxiliary ({})", note));
    }
    rec
}

fn missing_auxiliary_tag(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let (IssueTarget::Form(form_id), Some(AutoFix::AddTag { tag })) = (&issue.target, &issue.auto_fix)
    else {
        return manual_review(issue, ctx);
    };
    recommendation(
        issue,
        RecommendationCategory::AuxiliaryAssignment,
        SafetyLevel::Caution,
        format!("Tag compound form {} with '{}'", form_id, tag),
    )
    .with_reversible(StatementBuilder::array_append(Table::WordForms, Column::Tags, form_id, tag))
    .with_pre_check(ValidationCheck::FormExists {
        form_id: form_id.clone(),
    })
    .with_post_check(ValidationCheck::FormHasTag {
        form_id: form_id.clone(),
        tag: tag.clone(),
    })
}

fn missing_building_block_tag(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let IssueTarget::Form(form_id) = &issue.target else {
        return manual_review(issue, ctx);
    };
    let tag = match &issue.auto_fix {
        Some(AutoFix::AddTag { tag }) => tag.clone(),
        _ => ctx.catalog.form.building_block_tag.clone(),
    };
    recommendation(
        issue,
        RecommendationCategory::TagStandardization,
        SafetyLevel::Safe,
        format!("Mark base form {} as '{}'", form_id, tag),
    )
    .with_reversible(StatementBuilder::array_append(Table::WordForms, Column::Tags, form_id, &tag))
    .with_pre_check(ValidationCheck::FormExists {
        form_id: form_id.clone(),
    })
    .with_post_check(ValidationCheck::FormHasTag {
        form_id: form_id.clone(),
        tag,
    })
}

fn orphaned_form_reference(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let (IssueTarget::Translation(translation_id), Some(AutoFix::RemoveFormReference { form_id })) =
        (&issue.target, &issue.auto_fix)
    else {
        return manual_review(issue, ctx);
    };
    recommendation(
        issue,
        RecommendationCategory::CrossReference,
        SafetyLevel::Caution,
        format!("Drop dangling form reference {} from translation {}", form_id, translation_id),
    )
    .with_reversible(StatementBuilder::array_remove(
        Table::WordTranslations,
        Column::FormIds,
        translation_id,
        form_id,
    ))
    .with_pre_check(ValidationCheck::TranslationExists {
        translation_id: translation_id.clone(),
    })
}

fn auxiliary_mismatch(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
    let (IssueTarget::Form(form_id), Some(AutoFix::ReplaceTag { from, to })) = (&issue.target, &issue.auto_fix)
    else {
        return manual_review(issue, ctx);
    };
    recommendation(
        issue,
        RecommendationCategory::CrossReference,
        SafetyLevel::Caution,
        format!("Align form {} role tag '{}' with declared '{}'", form_id, from, to),
    )
    .with_reversible(StatementBuilder::array_replace(
        Table::WordForms,
        Column::Tags,
        form_id,
        from,
        to,
    ))
    .with_pre_check(ValidationCheck::FormHasTag {
        form_id: form_id.clone(),
        tag: from.clone(),
    })
    .with_post_check(ValidationCheck::FormLacksTag {
        form_id: form_id.clone(),
        tag: from.clone(),
    })
    .with_post_check(ValidationCheck::FormHasTag {
        form_id: form_id.clone(),
        tag: to.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{IssueLayer, Severity};
    use crate::recommendation::StatementOp;

    fn issue(rule: &str, target: IssueTarget, fix: Option<AutoFix>) -> ComplianceIssue {
        let issue = ComplianceIssue::new(rule, Severity::High, IssueLayer::Form, "w1", target, "msg");
        match fix {
            Some(fix) => issue.with_auto_fix(fix),
            None => issue,
        }
    }

    #[test]
    fn test_legacy_terminology_is_safe_replace() {
        let catalog = RuleCatalog::default();
        let ctx = HandlerContext { catalog: &catalog };
        let rec = HandlerRegistry::default().dispatch(
            &issue(
                rules::LEGACY_TERMINOLOGY,
                IssueTarget::Form("f1".into()),
                Some(AutoFix::ReplaceTag {
                    from: "lui".into(),
                    to: "terza-persona".into(),
                }),
            ),
            &ctx,
        );
        assert_eq!(rec.category, RecommendationCategory::Terminology);
        assert_eq!(rec.safety, SafetyLevel::Safe);
        assert_eq!(
            rec.forward[0].op,
            StatementOp::ArrayReplace {
                from: "lui".into(),
                to: "terza-persona".into()
            }
        );
        assert_eq!(
            rec.rollback[0].op,
            StatementOp::ArrayReplace {
                from: "terza-persona".into(),
                to: "lui".into()
            }
        );
        assert_eq!(rec.post_checks.len(), 2);
    }

    #[test]
    fn test_redundant_legacy_term_is_removed() {
        let catalog = RuleCatalog::default();
        let ctx = HandlerContext { catalog: &catalog };
        let rec = HandlerRegistry::default().dispatch(
            &issue(
                rules::LEGACY_TERMINOLOGY,
                IssueTarget::Form("f1".into()),
                Some(AutoFix::RemoveTag { tag: "lei".into() }),
            ),
            &ctx,
        );
        assert_eq!(rec.category, RecommendationCategory::Terminology);
        assert_eq!(rec.forward[0].op, StatementOp::ArrayRemove { value: "lei".into() });
        assert_eq!(rec.rollback[0].op, StatementOp::ArrayAppend { value: "lei".into() });
        assert!(!rec.validation_required);
    }

    #[test]
    fn test_missing_auxiliary_rolls_back_by_removing_key() {
        let catalog = RuleCatalog::default();
        let ctx = HandlerContext { catalog: &catalog };
        let rec = HandlerRegistry::default().dispatch(
            &issue(
                rules::MISSING_AUXILIARY,
                IssueTarget::Translation("t1".into()),
                Some(AutoFix::SetMetadata {
                    key: "auxiliary".into(),
                    value: "avere".into(),
                }),
            ),
            &ctx,
        );
        assert_eq!(rec.category, RecommendationCategory::AuxiliaryAssignment);
        assert_eq!(rec.forward[0].table, Table::WordTranslations);
        assert_eq!(
            rec.rollback[0].op,
            StatementOp::MetadataRemove {
                key: "auxiliary".into()
            }
        );
    }

    #[test]
    fn test_unfixable_issue_becomes_manual_review() {
        let catalog = RuleCatalog::default();
        let ctx = HandlerContext { catalog: &catalog };
        let registry = HandlerRegistry::default();

        let no_fix = registry.dispatch(
            &issue(rules::MISSING_AUXILIARY_TAG, IssueTarget::Form("f1".into()), None),
            &ctx,
        );
        assert_eq!(no_fix.safety, SafetyLevel::ManualReview);
        assert!(no_fix.forward.is_empty());

        let mood = registry.dispatch(
            &issue(rules::MISSING_MOOD, IssueTarget::Form("f1".into()), None)
                .with_manual_step("Assign exactly one mood tag"),
            &ctx,
        );
        assert_eq!(mood.category, RecommendationCategory::ManualReview);
        assert_eq!(mood.manual_steps, vec!["Assign exactly one mood tag".to_string()]);
        assert!(!registry.handles(rules::MISSING_MOOD));
    }

    #[test]
    fn test_custom_handler_registration() {
        fn always_manual(issue: &ComplianceIssue, ctx: &HandlerContext<'_>) -> MigrationRecommendation {
            manual_review(issue, ctx)
        }
        let catalog = RuleCatalog::default();
        let ctx = HandlerContext { catalog: &catalog };
        let mut registry = HandlerRegistry::default();
        registry.register(rules::LEGACY_TERMINOLOGY, always_manual);
        let rec = registry.dispatch(
            &issue(
                rules::LEGACY_TERMINOLOGY,
                IssueTarget::Form("f1".into()),
                Some(AutoFix::ReplaceTag {
                    from: "lui".into(),
                    to: "terza-persona".into(),
                }),
            ),
            &ctx,
        );
        assert_eq!(rec.safety, SafetyLevel::ManualReview);
    }
}
