//! End-to-end tests: validate, plan, execute, re-validate.

use lexis_core::catalog::rules;
use lexis_core::compliance::{ComplianceStatus, IssueTarget, Severity};
use lexis_core::migration::{ExecutionOptions, ExecutionStatus, MigrationExecutor, ValidationCheck};
use lexis_core::model::{Column, ContextMetadata, Dataset, Entity, EntityBundle, Form, Table, Translation};
use lexis_core::recommendation::{
    CustomRuleDefinition, CustomRuleStore, MigrationBatch, MigrationPlan, MigrationRecommendation,
    RecommendationCategory, RecommendationEngine, RollbackStrategy, RulePattern, SafetyLevel,
    StatementBuilder, Transformation, TransformationKind,
};
use lexis_core::{
    ComplianceValidator, EntityReader, LookupCache, MemoryLogger, MemoryStore, NullLogger, RuleCatalog,
    SharedLogger, ValidatorConfig,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A verb that passes every catalog rule.
fn complete_verb(id: &str) -> EntityBundle {
    let catalog = RuleCatalog::default();
    let entity = Entity::new(id, "parlare", "verb").with_tags(["are-verb", "transitive-verb"]);
    let mut bundle = EntityBundle::new(entity);

    let base = [
        ("parlato", ["participio", "passato"]),
        ("parlando", ["gerundio", "presente"]),
        ("parlare", ["infinito", "presente"]),
    ];
    for (i, (text, tags)) in base.iter().enumerate() {
        bundle = bundle.with_form(
            Form::new(format!("{}-b{}", id, i), id, *text).with_tags(tags.iter().copied().chain(["building-block"])),
        );
    }
    for (i, combo) in catalog.building_blocks.combinations.iter().enumerate() {
        let mut tags = combo.tags.clone();
        tags.push("singolare".into());
        let text = if combo.tags.contains(&"passato-prossimo".to_string()) {
            tags.push("avere-auxiliary".into());
            "ho parlato".to_string()
        } else {
            format!("parl{}", i)
        };
        bundle = bundle.with_form(Form::new(format!("{}-c{}", id, i), id, text).with_tags(tags));
    }

    let form_ids: Vec<String> = bundle.forms.iter().map(|f| f.id.clone()).collect();
    bundle.with_translation(
        Translation::new(format!("{}-t1", id), id, "to speak")
            .with_context(ContextMetadata::new().with_auxiliary("avere"))
            .with_form_ids(form_ids),
    )
}

/// A verb with a legacy tag, an unmarked base form and a dangling reference.
fn defective_verb(id: &str) -> EntityBundle {
    let mut bundle = complete_verb(id);
    for tag in bundle.forms[3].tags.iter_mut() {
        if tag == "singolare" {
            *tag = "singular".to_string();
        }
    }
    bundle.forms[0].tags.retain(|t| t != "building-block");
    bundle.translations[0]
        .form_ids
        .as_mut()
        .expect("fixture has form ids")
        .push("ghost".into());
    bundle
}

fn validator(logger: SharedLogger) -> ComplianceValidator {
    ComplianceValidator::new(RuleCatalog::default(), ValidatorConfig::default(), logger).unwrap()
}

fn options() -> ExecutionOptions {
    ExecutionOptions::default().with_batch_delay(Duration::ZERO)
}

fn tag_rec(id: &str, form_id: &str) -> MigrationRecommendation {
    let mut rec = MigrationRecommendation::new(
        rules::MISSING_BUILDING_BLOCK_TAG,
        Severity::Medium,
        "w1",
        IssueTarget::Form(form_id.into()),
        RecommendationCategory::TagStandardization,
        SafetyLevel::Safe,
        format!("mark {}", form_id),
    )
    .with_reversible(StatementBuilder::array_append(
        Table::WordForms,
        Column::Tags,
        form_id,
        "building-block",
    ))
    .with_pre_check(ValidationCheck::FormExists {
        form_id: form_id.into(),
    });
    rec.id = id.to_string();
    rec
}

fn two_batch_plan(failing_form: &str) -> MigrationPlan {
    let batch = |id: &str, recs: Vec<MigrationRecommendation>, deps: Vec<String>| MigrationBatch {
        id: id.to_string(),
        name: id.to_string(),
        category: RecommendationCategory::TagStandardization,
        estimated_secs: 2 * recs.len() as u64,
        recommendations: recs,
        dependencies: deps,
    };
    let mut failing = tag_rec("b1", failing_form);
    failing.validation_required = true;
    MigrationPlan::new(vec![
        batch("a", vec![tag_rec("a1", "f1"), tag_rec("a2", "f2")], Vec::new()),
        batch("b", vec![failing], vec!["a".to_string()]),
    ])
}

fn small_store() -> MemoryStore {
    let mut bundle = EntityBundle::new(Entity::new("w1", "parlare", "verb"));
    for id in ["f1", "f2", "f3"] {
        bundle = bundle.with_form(Form::new(id, "w1", "parlato").with_tags(["participio", "passato"]));
    }
    MemoryStore::new(Dataset::new().with_bundle(bundle))
}

#[test]
fn test_full_pipeline_reaches_compliance() {
    let logger = MemoryLogger::new();
    let shared: SharedLogger = Arc::new(logger.clone());
    let mut store = MemoryStore::new(
        Dataset::new()
            .with_bundle(complete_verb("w1"))
            .with_bundle(defective_verb("w2")),
    );
    let mut validator = validator(shared.clone());
    let mut cache = LookupCache::new();

    let before = validator.validate_system(&store, &mut cache).unwrap();
    assert_eq!(before.total_entities, 2);
    assert_eq!(before.distribution.compliant, 1);
    assert!(!before.readiness.ready);
    assert!(before
        .top_issues
        .iter()
        .any(|t| t.rule_id == rules::LEGACY_TERMINOLOGY));

    let engine = RecommendationEngine::new(RuleCatalog::default(), shared.clone());
    let plan = engine.create_plan(validator.results());
    assert_eq!(plan.counts.total, 3);
    assert_eq!(plan.counts.manual_review, 0);
    assert!(plan.verify_digest());

    let executor = MigrationExecutor::new(shared);
    let execution = executor.execute(&plan, &mut store, &options()).unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed, "{:?}", execution.errors);
    assert_eq!(execution.successful_migrations.len(), 3);
    assert!(execution.failed_migrations.is_empty());
    assert!(execution.warnings.is_empty());
    assert_eq!(execution.total_rows_affected, 3);
    assert!(!logger.events("migration.completed").is_empty());

    let after = validator.validate_system(&store, &mut cache).unwrap();
    assert_eq!(after.distribution.compliant, 2);
    assert_eq!(after.total_issues, 0);
    assert!(after.readiness.ready);

    let form = store.form("w2-b0").unwrap().unwrap();
    assert!(form.has_tag("building-block"));
    let translation = store.translation("w2-t1").unwrap().unwrap();
    assert!(!translation.form_refs().contains(&"ghost".to_string()));
}

#[test]
fn test_terminology_batch_precedes_cross_reference() {
    let mut store = MemoryStore::new(Dataset::new().with_bundle(defective_verb("w1")));
    let mut validator = validator(Arc::new(NullLogger));
    validator.validate_system(&store, &mut LookupCache::new()).unwrap();
    let plan = RecommendationEngine::new(RuleCatalog::default(), Arc::new(NullLogger)).create_plan(validator.results());

    let ids: Vec<&str> = plan.batches.iter().map(|b| b.id.as_str()).collect();
    let terminology = ids.iter().position(|id| *id == "terminology").unwrap();
    let cross_reference = ids.iter().position(|id| *id == "cross-reference").unwrap();
    assert!(terminology < cross_reference);

    let order = MigrationExecutor::execution_order(&plan).unwrap();
    let run_position = |index: usize| order.iter().position(|i| *i == index).unwrap();
    assert!(run_position(terminology) < run_position(cross_reference));

    let execution = MigrationExecutor::new(Arc::new(NullLogger))
        .execute(&plan, &mut store, &options())
        .unwrap();
    assert_eq!(execution.results[0].batch_id, "terminology");
    assert_eq!(execution.results.last().map(|r| r.batch_id.as_str()), Some("cross-reference"));
}

#[test]
fn test_rollback_replays_in_reverse() {
    let plan = two_batch_plan("f3");
    let mut store = small_store().fail_on("f3");
    let execution = MigrationExecutor::new(Arc::new(NullLogger))
        .execute(&plan, &mut store, &options().with_stop_on_error(true))
        .unwrap();

    assert_eq!(execution.successful_migrations, vec!["a1".to_string(), "a2".to_string()]);
    assert_eq!(execution.failed_migrations, vec!["b1".to_string()]);
    assert_eq!(execution.rolled_back, vec!["a2".to_string(), "a1".to_string()]);
    assert_eq!(execution.status, ExecutionStatus::RolledBack);

    let a = &plan.batches[0].recommendations;
    let expected = vec![
        a[0].forward[0].sql.clone(),
        a[1].forward[0].sql.clone(),
        a[1].rollback[0].sql.clone(),
        a[0].rollback[0].sql.clone(),
    ];
    assert_eq!(store.executed(), expected.as_slice());
    for id in ["f1", "f2"] {
        assert!(!store.form(id).unwrap().unwrap().has_tag("building-block"));
    }
}

#[test]
fn test_dry_run_matches_real_run_without_mutations() {
    let plan = two_batch_plan("f404");
    let run = |dry_run: bool| {
        let logger = MemoryLogger::new();
        let mut store = small_store();
        let execution = MigrationExecutor::new(Arc::new(logger.clone()))
            .execute(
                &plan,
                &mut store,
                &options().with_skip_validation(true).with_dry_run(dry_run),
            )
            .unwrap();
        (execution, store, logger)
    };

    let (real, real_store, _) = run(false);
    let (dry, dry_store, dry_logs) = run(true);

    assert_eq!(real.successful_migrations, dry.successful_migrations);
    assert_eq!(real.failed_migrations, dry.failed_migrations);
    assert_eq!(dry.failed_migrations, vec!["b1".to_string()]);
    assert!(real_store.mutation_calls() > 0);
    assert_eq!(dry_store.mutation_calls(), 0);
    assert!(dry.dry_run);
    assert_eq!(dry_logs.events("migration.statement_planned").len(), 2);
}

#[test]
fn test_rollback_restores_tags_sharing_a_canonical_term() {
    let shapes = [
        ("f1", vec!["participio", "lui", "terza-persona"]),
        ("f2", vec!["participio", "lui", "lei"]),
    ];
    let mut bundle = EntityBundle::new(Entity::new("w1", "parlare", "verb"));
    for (id, tags) in &shapes {
        bundle = bundle.with_form(Form::new(*id, "w1", "parlato").with_tags(tags.iter().copied()));
    }
    bundle = bundle.with_form(Form::new("f3", "w1", "parlato").with_tags(["participio"]));
    let mut store = MemoryStore::new(Dataset::new().with_bundle(bundle)).fail_on("f3");

    let mut validator = validator(Arc::new(NullLogger));
    validator.validate_system(&store, &mut LookupCache::new()).unwrap();
    let engine = RecommendationEngine::new(RuleCatalog::default(), Arc::new(NullLogger));
    let legacy: Vec<_> = engine
        .recommendations_for(validator.results())
        .into_iter()
        .filter(|r| r.rule_id == rules::LEGACY_TERMINOLOGY)
        .collect();
    assert_eq!(legacy.len(), 3);

    let mut failing = tag_rec("z1", "f3");
    failing.validation_required = true;
    let batch = |id: &str, category, recs: Vec<MigrationRecommendation>, deps: Vec<String>| MigrationBatch {
        id: id.to_string(),
        name: id.to_string(),
        category,
        estimated_secs: 2 * recs.len() as u64,
        recommendations: recs,
        dependencies: deps,
    };
    let plan = MigrationPlan::new(vec![
        batch("terminology", RecommendationCategory::Terminology, legacy, Vec::new()),
        batch(
            "tag-standardization",
            RecommendationCategory::TagStandardization,
            vec![failing],
            vec!["terminology".to_string()],
        ),
    ]);

    let execution = MigrationExecutor::new(Arc::new(NullLogger))
        .execute(&plan, &mut store, &options())
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::RolledBack, "{:?}", execution.errors);
    assert_eq!(execution.rolled_back.len(), 3);

    for (id, tags) in &shapes {
        let mut restored = store.form(id).unwrap().unwrap().tags;
        restored.sort();
        let mut expected: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        expected.sort();
        assert_eq!(restored, expected, "form {}", id);
    }
}

#[test]
fn test_dry_run_sees_terminology_before_cross_reference() {
    let mut bundle = complete_verb("w1");
    for form in bundle.forms.iter_mut() {
        for tag in form.tags.iter_mut() {
            if tag == "avere-auxiliary" {
                *tag = "avere-aux".to_string();
            }
        }
    }
    bundle.translations[0].context = ContextMetadata::new().with_auxiliary("essere");
    let dataset = Dataset::new().with_bundle(bundle);

    let mut validator = validator(Arc::new(NullLogger));
    validator
        .validate_system(&MemoryStore::new(dataset.clone()), &mut LookupCache::new())
        .unwrap();
    let plan = RecommendationEngine::new(RuleCatalog::default(), Arc::new(NullLogger)).create_plan(validator.results());
    let ids: Vec<&str> = plan.batches.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["terminology", "cross-reference"]);

    let run = |dry_run: bool| {
        let mut store = MemoryStore::new(dataset.clone());
        let execution = MigrationExecutor::new(Arc::new(NullLogger))
            .execute(&plan, &mut store, &options().with_dry_run(dry_run))
            .unwrap();
        (execution, store)
    };
    let (real, real_store) = run(false);
    let (dry, dry_store) = run(true);

    assert_eq!(real.status, ExecutionStatus::Completed, "{:?}", real.errors);
    assert_eq!(dry.status, real.status, "{:?}", dry.errors);
    assert_eq!(dry.successful_migrations, real.successful_migrations);
    assert!(dry.failed_migrations.is_empty());
    assert_eq!(dry_store.mutation_calls(), 0);
    assert!(real_store
        .dataset()
        .bundles[0]
        .forms
        .iter()
        .all(|f| !f.has_tag("avere-aux") && !f.has_tag("avere-auxiliary")));
}

#[test]
fn test_entity_without_translations_goes_to_manual_review() {
    let mut bundle = complete_verb("w1");
    bundle.translations.clear();
    let mut store = MemoryStore::new(Dataset::new().with_bundle(bundle));
    let mut validator = validator(Arc::new(NullLogger));
    let system = validator.validate_system(&store, &mut LookupCache::new()).unwrap();

    let report = &validator.results()[0];
    assert_eq!(report.translation_issues.len(), 1);
    assert_eq!(report.translation_issues[0].rule_id, rules::NO_TRANSLATIONS);
    assert_eq!(report.status, ComplianceStatus::BlocksMigration);
    assert!(!system.readiness.ready);

    let plan = RecommendationEngine::new(RuleCatalog::default(), Arc::new(NullLogger)).create_plan(validator.results());
    assert_eq!(plan.batches.len(), 1);
    assert_eq!(plan.batches[0].category, RecommendationCategory::ManualReview);

    let execution = MigrationExecutor::new(Arc::new(NullLogger))
        .execute(&plan, &mut store, &options())
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.skipped.len(), 1);
    assert_eq!(store.mutation_calls(), 0);
}

#[test]
fn test_custom_rule_round_trip_through_sled() {
    let dir = tempfile::tempdir().unwrap();
    let db = sled::open(dir.path()).unwrap();
    let rules_store = CustomRuleStore::open(&db).unwrap();
    rules_store
        .save(&CustomRuleDefinition {
            id: "mark-reviewed".into(),
            name: "Mark reviewed verbs".into(),
            description: String::new(),
            pattern: RulePattern {
                table: Table::Words,
                column: Column::Tags,
                target_tags: vec!["are-verb".into()],
                target_ids: Vec::new(),
            },
            transformation: Transformation {
                kind: TransformationKind::AddTags,
                mappings: BTreeMap::new(),
                tags_to_add: vec!["reviewed".into()],
                tags_to_remove: Vec::new(),
            },
            safety_checks: vec!["target-exists".into()],
            rollback_strategy: RollbackStrategy::Inverse,
        })
        .unwrap();
    let rule = rules_store.load("mark-reviewed").unwrap().unwrap();

    let mut store = MemoryStore::new(
        Dataset::new()
            .with_bundle(complete_verb("w1"))
            .with_bundle(EntityBundle::new(Entity::new("w2", "temere", "verb").with_tag("ere-verb"))),
    );
    let engine = RecommendationEngine::new(RuleCatalog::default(), Arc::new(NullLogger));
    let recs = engine.recommend_custom(&rule, &store).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].entity_id, "w1");

    let plan = engine.plan_from(recs);
    let execution = MigrationExecutor::new(Arc::new(NullLogger))
        .execute(&plan, &mut store, &options())
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(store.entity("w1").unwrap().unwrap().has_tag("reviewed"));
    assert!(!store.entity("w2").unwrap().unwrap().has_tag("reviewed"));
}
