//! Recommendation engine.

use super::batch::{create_batches, MigrationBatch};
use super::custom::{CustomRuleDefinition, RollbackStrategy};
use super::handlers::{HandlerContext, HandlerRegistry};
use super::plan::MigrationPlan;
use super::types::{MigrationRecommendation, RecommendationCategory};
use crate::catalog::RuleCatalog;
use crate::compliance::{ComplianceIssue, EntityComplianceReport, IssueTarget, Severity};
use crate::error::Error;
use crate::logging::SharedLogger;
use crate::migration::ValidationCheck;
use crate::model::Table;
use crate::store::{EntityFilter, EntityReader};

/// Turns compliance issues into recommendations and plans.
pub struct RecommendationEngine {
    catalog: RuleCatalog,
    registry: HandlerRegistry,
    logger: SharedLogger,
}

impl RecommendationEngine {
    /// Create an engine with the built-in handlers.
    pub fn new(catalog: RuleCatalog, logger: SharedLogger) -> Self {
        Self {
            catalog,
            registry: HandlerRegistry::default(),
            logger,
        }
    }

    /// Replace the handler registry.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Recommendation for a single issue. The id is left empty.
    pub fn recommend(&self, issue: &ComplianceIssue) -> MigrationRecommendation {
        let ctx = HandlerContext {
            catalog: &self.catalog,
        };
        self.registry.dispatch(issue, &ctx)
    }

    /// Recommendations for every issue in the reports, with ids assigned in
    /// report order.
    pub fn recommendations_for(&self, reports: &[EntityComplianceReport]) -> Vec<MigrationRecommendation> {
        let mut recs: Vec<MigrationRecommendation> = reports
            .iter()
            .flat_map(|r| r.issues())
            .map(|issue| self.recommend(issue))
            .collect();
        assign_ids(&mut recs, "rec");
        recs
    }

    /// Partition recommendations into batches.
    pub fn create_batches(&self, recommendations: Vec<MigrationRecommendation>) -> Vec<MigrationBatch> {
        create_batches(recommendations)
    }

    /// Build a plan for the reports.
    pub fn create_plan(&self, reports: &[EntityComplianceReport]) -> MigrationPlan {
        self.plan_from(self.recommendations_for(reports))
    }

    /// Build a plan from prepared recommendations.
    pub fn plan_from(&self, recommendations: Vec<MigrationRecommendation>) -> MigrationPlan {
        let plan = MigrationPlan::new(self.create_batches(recommendations));
        self.logger.info(
            "plan.created",
            &[
                ("plan_id", plan.id.clone()),
                ("batches", plan.batches.len().to_string()),
                ("recommendations", plan.counts.total.to_string()),
                ("risk", plan.risk.to_string()),
                ("digest", plan.digest.clone()),
            ],
        );
        plan
    }

    /// Recommendations for a custom rule, one per matching row.
    pub fn recommend_custom<R>(
        &self,
        rule: &CustomRuleDefinition,
        reader: &R,
    ) -> Result<Vec<MigrationRecommendation>, Error>
    where
        R: EntityReader + ?Sized,
    {
        rule.check()?;
        let mut filter = EntityFilter::all();
        if rule.pattern.table == Table::Words && !rule.pattern.target_ids.is_empty() {
            filter = filter.with_ids(rule.pattern.target_ids.iter().cloned());
        }

        let mut rows: Vec<(String, IssueTarget, Vec<String>)> = Vec::new();
        for entity in reader.entities(&filter)? {
            match rule.pattern.table {
                Table::Words => {
                    rows.push((entity.id.clone(), IssueTarget::Entity(entity.id.clone()), entity.tags));
                }
                _ => {
                    let bundle = reader.bundle(&entity.id)?;
                    for form in bundle.forms {
                        rows.push((entity.id.clone(), IssueTarget::Form(form.id), form.tags));
                    }
                }
            }
        }

        let mut ignored = Vec::new();
        let mut recs = Vec::new();
        for (entity_id, target, tags) in rows {
            let row_id = target.id().to_string();
            if !rule.pattern.matches(&row_id, &tags) {
                continue;
            }
            let statements = rule.statements_for(&row_id, &tags);
            if statements.is_empty() {
                continue;
            }

            let mut rec = MigrationRecommendation::new(
                rule.rule_id(),
                Severity::Medium,
                entity_id,
                target,
                RecommendationCategory::TagStandardization,
                rule.safety(),
                format!("{} on {} {}", rule.name, rule.pattern.table, row_id),
            );
            for statement in statements {
                rec = match rule.rollback_strategy {
                    RollbackStrategy::Inverse => rec.with_reversible(statement),
                    RollbackStrategy::Manual => {
                        rec.forward.push(statement);
                        rec
                    }
                };
            }
            if rule.rollback_strategy == RollbackStrategy::Manual {
                rec.manual_steps.push(format!("Undo '{}' by hand if needed", rule.name));
            }
            for name in &rule.safety_checks {
                match ValidationCheck::existence(name, rule.pattern.table, &row_id) {
                    Some(check) => rec.pre_checks.push(check),
                    None if !ignored.contains(name) => ignored.push(name.clone()),
                    None => {}
                }
            }
            rec.validation_required = true;
            recs.push(rec);
        }

        for name in ignored {
            self.logger.warn(
                "custom_rule.unknown_check",
                &[("rule_id", rule.id.clone()), ("check", name)],
            );
        }
        assign_ids(&mut recs, &format!("custom-{}", rule.id));
        self.logger.info(
            "custom_rule.recommended",
            &[("rule_id", rule.id.clone()), ("recommendations", recs.len().to_string())],
        );
        Ok(recs)
    }
}

fn assign_ids(recs: &mut [MigrationRecommendation], prefix: &str) {
    for (i, rec) in recs.iter_mut().enumerate() {
        rec.id = format!("{}-{:04}", prefix, i + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{ComplianceValidator, ValidatorConfig};
    use crate::logging::{MemoryLogger, NullLogger};
    use crate::model::{Column, Dataset, Entity, EntityBundle, Form};
    use crate::recommendation::{RulePattern, SafetyLevel, Transformation, TransformationKind};
    use crate::store::MemoryStore;
    use crate::cache::LookupCache;
    use std::sync::Arc;

    fn engine() -> RecommendationEngine {
        RecommendationEngine::new(RuleCatalog::default(), Arc::new(NullLogger))
    }

    fn reports(dataset: &Dataset) -> Vec<EntityComplianceReport> {
        let validator = ComplianceValidator::new(
            RuleCatalog::default(),
            ValidatorConfig::default().with_building_blocks(false),
            Arc::new(NullLogger),
        )
        .unwrap();
        let mut cache = LookupCache::new();
        dataset
            .bundles
            .iter()
            .map(|b| validator.validate_entity(b, &mut cache))
            .collect()
    }

    fn legacy_dataset() -> Dataset {
        Dataset::new().with_bundle(
            EntityBundle::new(Entity::new("w1", "parlare", "verb").with_tags(["are-verb", "transitive-verb"]))
                .with_form(
                    Form::new("f1", "w1", "parla")
                        .with_tags(["indicativo", "presente", "lui", "singolare"]),
                ),
        )
    }

    #[test]
    fn test_plan_from_reports() {
        let dataset = legacy_dataset();
        let plan = engine().create_plan(&reports(&dataset));

        assert_eq!(plan.batches[0].id, "terminology");
        let first = &plan.batches[0].recommendations[0];
        assert_eq!(first.safety, SafetyLevel::Safe);
        assert!(first.id.starts_with("rec-"));
        assert!(plan.batch("manual-review").is_some());
        assert!(plan.verify_digest());
    }

    #[test]
    fn test_ids_are_unique() {
        let dataset = legacy_dataset();
        let recs = engine().recommendations_for(&reports(&dataset));
        let mut ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
        assert_eq!(recs[0].id, "rec-0001");
    }

    #[test]
    fn test_custom_rule_recommendations() {
        let store = MemoryStore::new(legacy_dataset());
        let logger = Arc::new(MemoryLogger::new());
        let engine = RecommendationEngine::new(RuleCatalog::default(), logger.clone());
        let rule = CustomRuleDefinition {
            id: "sing".into(),
            name: "Rename singular".into(),
            description: String::new(),
            pattern: RulePattern {
                table: Table::WordForms,
                column: Column::Tags,
                target_tags: Vec::new(),
                target_ids: Vec::new(),
            },
            transformation: Transformation {
                kind: TransformationKind::TagMapping,
                mappings: [("singolare".to_string(), "numero-singolare".to_string())].into_iter().collect(),
                tags_to_add: Vec::new(),
                tags_to_remove: Vec::new(),
            },
            safety_checks: vec!["target-exists".into(), "bogus".into()],
            rollback_strategy: RollbackStrategy::Inverse,
        };

        let recs = engine.recommend_custom(&rule, &store).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, "custom-sing-0001");
        assert_eq!(recs[0].rule_id, "custom:sing");
        assert_eq!(recs[0].forward.len(), recs[0].rollback.len());
        assert_eq!(
            recs[0].pre_checks,
            vec![ValidationCheck::FormExists {
                form_id: "f1".into()
            }]
        );
        assert_eq!(logger.events("custom_rule.unknown_check").len(), 1);
    }
}
