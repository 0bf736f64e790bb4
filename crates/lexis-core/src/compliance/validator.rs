//! Catalog-driven compliance validator.

use super::issue::{AutoFix, ComplianceIssue, IssueLayer, IssueTarget, Severity};
use super::report::{
    BuildingBlockReport, DeprecatedContentReport, EntityComplianceReport, EntityLoadError,
    FormWarning, SystemComplianceReport,
};
use crate::cache::{LookupCache, TextTraits};
use crate::catalog::{rules, RuleCatalog, TagRequirement};
use crate::error::Error;
use crate::logging::SharedLogger;
use crate::model::{Auxiliary, EntityBundle, Translation};
use crate::store::{EntityFilter, EntityReader};
use crate::terminology::{ConversionOptions, TerminologyConverter};
use regex::Regex;
use std::collections::HashMap;

/// Validator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Check references between translations and forms.
    pub check_cross_references: bool,
    /// Count out-of-scope content.
    pub detect_deprecated: bool,
    /// Check building-block completeness.
    pub check_building_blocks: bool,
    /// Mean score required for a ready verdict.
    pub readiness_threshold: f64,
    /// Number of rule ids in the top-issue list.
    pub top_issue_limit: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            check_cross_references: true,
            detect_deprecated: true,
            check_building_blocks: true,
            readiness_threshold: 80.0,
            top_issue_limit: 10,
        }
    }
}

impl ValidatorConfig {
    /// Enable or disable cross-reference checks.
    pub fn with_cross_references(mut self, enabled: bool) -> Self {
        self.check_cross_references = enabled;
        self
    }

    /// Enable or disable deprecated-content detection.
    pub fn with_deprecated_detection(mut self, enabled: bool) -> Self {
        self.detect_deprecated = enabled;
        self
    }

    /// Enable or disable building-block checks.
    pub fn with_building_blocks(mut self, enabled: bool) -> Self {
        self.check_building_blocks = enabled;
        self
    }

    /// Set the readiness threshold.
    pub fn with_readiness_threshold(mut self, threshold: f64) -> Self {
        self.readiness_threshold = threshold;
        self
    }

    /// Set the top-issue list length.
    pub fn with_top_issue_limit(mut self, limit: usize) -> Self {
        self.top_issue_limit = limit;
        self
    }
}

/// Evaluates a [`RuleCatalog`] against entity data.
pub struct ComplianceValidator {
    catalog: RuleCatalog,
    config: ValidatorConfig,
    converter: TerminologyConverter,
    compound: Regex,
    deprecated: Vec<(String, Regex)>,
    logger: SharedLogger,
    results: Vec<EntityComplianceReport>,
}

/// Per-form data shared by the form and cross-reference layers.
struct FormView {
    canonical_tags: Vec<String>,
    role: Option<Auxiliary>,
    traits: TextTraits,
}

impl ComplianceValidator {
    /// Create a validator, compiling the catalog's patterns.
    pub fn new(catalog: RuleCatalog, config: ValidatorConfig, logger: SharedLogger) -> Result<Self, Error> {
        catalog.check()?;
        let compound = Regex::new(&catalog.form.compound_pattern)
            .map_err(|e| Error::InvalidCatalog(format!("compound pattern: {}", e)))?;
        let deprecated = catalog
            .deprecated
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|re| (p.name.clone(), re))
                    .map_err(|e| Error::InvalidCatalog(format!("pattern '{}': {}", p.name, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            catalog,
            config,
            converter: TerminologyConverter::new(),
            compound,
            deprecated,
            logger,
            results: Vec::new(),
        })
    }

    /// The rule catalog.
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// The configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Entity reports from the last system run.
    pub fn results(&self) -> &[EntityComplianceReport] {
        &self.results
    }

    /// Classify a form's text.
    pub fn classify_text(&self, text: &str) -> TextTraits {
        let trimmed = text.trim();
        let compound = self.compound.is_match(trimmed);
        let leading_auxiliary = if compound {
            trimmed
                .split_whitespace()
                .next()
                .map(str::to_lowercase)
                .and_then(|word| {
                    if self.catalog.form.avere_forms.contains(&word) {
                        Some(Auxiliary::Avere)
                    } else if self.catalog.form.essere_forms.contains(&word) {
                        Some(Auxiliary::Essere)
                    } else {
                        None
                    }
                })
        } else {
            None
        };
        let deprecated = self
            .deprecated
            .iter()
            .find(|(_, re)| re.is_match(trimmed))
            .map(|(name, _)| name.clone());

        TextTraits {
            compound,
            leading_auxiliary,
            deprecated,
        }
    }

    /// Validate every entity the reader returns.
    ///
    /// Entities that fail to load are recorded in the report's error list;
    /// the run continues with the rest.
    pub fn validate_system<R>(&mut self, reader: &R, cache: &mut LookupCache) -> Result<SystemComplianceReport, Error>
    where
        R: EntityReader + ?Sized,
    {
        self.results.clear();
        let entities = reader.entities(&EntityFilter::all())?;
        let mut errors = Vec::new();

        for entity in &entities {
            match reader.bundle(&entity.id) {
                Ok(bundle) => {
                    let report = self.validate_entity(&bundle, cache);
                    self.results.push(report);
                }
                Err(e) => {
                    self.logger.warn(
                        "validation.entity_load_failed",
                        &[("entity", entity.id.clone()), ("error", e.to_string())],
                    );
                    errors.push(EntityLoadError {
                        entity_id: entity.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let report = SystemComplianceReport::aggregate(
            &self.results,
            errors,
            self.config.readiness_threshold,
            self.config.top_issue_limit,
        );
        self.logger.info(
            "validation.completed",
            &[
                ("entities", report.total_entities.to_string()),
                ("issues", report.total_issues.to_string()),
                ("mean_score", format!("{:.1}", report.mean_score)),
                ("ready", report.readiness.ready.to_string()),
            ],
        );
        Ok(report)
    }

    /// Validate one entity with its children.
    pub fn validate_entity(&self, bundle: &EntityBundle, cache: &mut LookupCache) -> EntityComplianceReport {
        let entity = &bundle.entity;
        let mut report = EntityComplianceReport::new(&entity.id, &entity.text);
        let applies = self.catalog.applies_to(&entity.category);
        if !applies {
            report
                .notes
                .push(format!("no catalog rules for category '{}'", entity.category));
        }

        let version = self.catalog.version;
        let views: HashMap<&str, FormView> = bundle
            .forms
            .iter()
            .map(|form| {
                let converted = self
                    .converter
                    .convert_tag_set(&form.tags, &ConversionOptions::full_migration());
                if !converted.warnings.is_empty() {
                    report
                        .terminology_warnings
                        .extend(converted.warnings.iter().cloned().map(|warning| FormWarning {
                            form_id: form.id.clone(),
                            warning,
                        }));
                }
                let role = converted
                    .tags
                    .iter()
                    .find_map(|t| Auxiliary::from_role_tag(t));
                let traits = cache.text_traits(version, &form.text, |t| self.classify_text(t));
                (
                    form.id.as_str(),
                    FormView {
                        canonical_tags: converted.tags,
                        role,
                        traits,
                    },
                )
            })
            .collect();

        if applies {
            report.entity_issues = self.check_entity(bundle);
        }
        report.translation_issues = self.check_translations(bundle, &views, applies);
        report.form_issues = self.check_forms(bundle, &views, applies);
        if self.config.check_cross_references {
            report.cross_reference_issues = self.check_cross_references(bundle, &views);
        }
        if applies && self.config.check_building_blocks {
            report.building_blocks = Some(self.check_building_blocks(&views));
        }
        if self.config.detect_deprecated {
            let mut deprecated = DeprecatedContentReport::default();
            for form in &bundle.forms {
                if let Some(name) = views.get(form.id.as_str()).and_then(|v| v.traits.deprecated.as_deref()) {
                    deprecated.record(name, &form.id);
                }
            }
            report.deprecated = Some(deprecated);
        }

        report.finalize(&self.catalog.scoring);
        self.logger.debug(
            "validation.entity",
            &[
                ("entity", entity.id.clone()),
                ("score", report.score.to_string()),
                ("status", report.status.to_string()),
            ],
        );
        report
    }

    fn check_entity(&self, bundle: &EntityBundle) -> Vec<ComplianceIssue> {
        let entity = &bundle.entity;
        let entity_rules = &self.catalog.entity;
        let mut issues = Vec::new();

        let inferred = self
            .catalog
            .infer_classification(&entity.text)
            .filter(|tag| entity_rules.classification.tags.iter().any(|t| t == tag));
        issues.extend(requirement_issues(
            &entity_rules.classification,
            &entity.tags,
            IssueLayer::Entity,
            &entity.id,
            IssueTarget::Entity(entity.id.clone()),
            &entity.text,
            inferred,
        ));
        issues.extend(requirement_issues(
            &entity_rules.secondary,
            &entity.tags,
            IssueLayer::Entity,
            &entity.id,
            IssueTarget::Entity(entity.id.clone()),
            &entity.text,
            None,
        ));
        issues
    }

    fn check_translations(
        &self,
        bundle: &EntityBundle,
        views: &HashMap<&str, FormView>,
        applies: bool,
    ) -> Vec<ComplianceIssue> {
        let entity = &bundle.entity;
        if bundle.translations.is_empty() {
            return vec![ComplianceIssue::new(
                rules::NO_TRANSLATIONS,
                Severity::Critical,
                IssueLayer::Translation,
                &entity.id,
                IssueTarget::Entity(entity.id.clone()),
                format!("'{}' has no translations", entity.text),
            )
            .with_expected("at least one translation")
            .with_manual_step("Add a translation for this entity")];
        }
        if !applies {
            return Vec::new();
        }

        let translation_rules = &self.catalog.translation;
        let key = translation_rules.required_metadata_key.as_str();
        let mut issues = Vec::new();

        for translation in &bundle.translations {
            let target = IssueTarget::Translation(translation.id.clone());
            match translation.context.get(key) {
                None => {
                    let (value, note) = match self.infer_auxiliary(bundle, translation, views) {
                        Some((aux, form_id)) if translation_rules.allowed_values.iter().any(|v| v == aux.as_str()) => {
                            (aux.as_str().to_string(), format!("inferred from form '{}'", form_id))
                        }
                        _ => (
                            translation_rules.default_value.clone(),
                            "no compound form to infer from; using the default".to_string(),
                        ),
                    };
                    issues.push(
                        ComplianceIssue::new(
                            rules::MISSING_AUXILIARY,
                            Severity::High,
                            IssueLayer::Translation,
                            &entity.id,
                            target,
                            format!("translation '{}' has no {}", translation.meaning, key),
                        )
                        .with_expected(translation_rules.allowed_values.join(" | "))
                        .with_auto_fix(AutoFix::SetMetadata {
                            key: key.to_string(),
                            value,
                        })
                        .with_context(note),
                    );
                }
                Some(value) if !translation_rules.allowed_values.contains(&value) => {
                    issues.push(
                        ComplianceIssue::new(
                            rules::INVALID_AUXILIARY,
                            Severity::High,
                            IssueLayer::Translation,
                            &entity.id,
                            target,
                            format!("translation '{}' has invalid {} '{}'", translation.meaning, key, value),
                        )
                        .with_current(value)
                        .with_expected(translation_rules.allowed_values.join(" | "))
                        .with_manual_step(format!("Set {} to one of the allowed values", key)),
                    );
                }
                Some(_) => {}
            }

            if translation_rules.require_form_ids && translation.form_refs().is_empty() {
                let linked = bundle.linked_form_ids(&translation.id);
                let mut issue = ComplianceIssue::new(
                    rules::MISSING_FORM_IDS,
                    Severity::Medium,
                    IssueLayer::Translation,
                    &entity.id,
                    IssueTarget::Translation(translation.id.clone()),
                    format!("translation '{}' references no forms", translation.meaning),
                )
                .with_expected("non-empty form_ids")
                .with_manual_step("Link the translation to the forms it applies to");
                if !linked.is_empty() {
                    issue = issue.with_context(format!(
                        "{} forms are linked through the join table",
                        linked.len()
                    ));
                }
                issues.push(issue);
            }
        }
        issues
    }

    fn infer_auxiliary(
        &self,
        bundle: &EntityBundle,
        translation: &Translation,
        views: &HashMap<&str, FormView>,
    ) -> Option<(Auxiliary, String)> {
        translation.form_refs().iter().find_map(|id| {
            let form = bundle.form(id)?;
            let view = views.get(id.as_str())?;
            if !view.traits.compound {
                return None;
            }
            view.role
                .or(view.traits.leading_auxiliary)
                .map(|aux| (aux, form.id.clone()))
        })
    }

    fn check_forms(
        &self,
        bundle: &EntityBundle,
        views: &HashMap<&str, FormView>,
        applies: bool,
    ) -> Vec<ComplianceIssue> {
        let entity_id = bundle.entity.id.as_str();
        let form_rules = &self.catalog.form;
        let mut issues = Vec::new();

        for form in &bundle.forms {
            let Some(view) = views.get(form.id.as_str()) else {
                continue;
            };
            let target = IssueTarget::Form(form.id.clone());

            // Only one legacy source may be replaced into a canonical term
            // the form does not carry yet; any other source is removed.
            let mut claimed: Vec<&str> = Vec::new();
            for legacy in self.converter.legacy_tags(&form.tags) {
                let canonical = self.converter.to_canonical(legacy).unwrap_or(legacy);
                let auto_fix = if form.has_tag(canonical) || claimed.contains(&canonical) {
                    AutoFix::RemoveTag {
                        tag: legacy.to_string(),
                    }
                } else {
                    claimed.push(canonical);
                    AutoFix::ReplaceTag {
                        from: legacy.to_string(),
                        to: canonical.to_string(),
                    }
                };
                let mut issue = ComplianceIssue::new(
                    rules::LEGACY_TERMINOLOGY,
                    Severity::Critical,
                    IssueLayer::Form,
                    entity_id,
                    target.clone(),
                    format!("form '{}' uses legacy term '{}'", form.text, legacy),
                )
                .with_current(legacy)
                .with_expected(canonical)
                .with_auto_fix(auto_fix);
                if let Some(category) = self.converter.category(legacy) {
                    issue = issue.with_context(format!("{} term", category));
                }
                issues.push(issue);
            }

            if !applies {
                continue;
            }

            for requirement in &form_rules.required {
                issues.extend(requirement_issues(
                    requirement,
                    &view.canonical_tags,
                    IssueLayer::Form,
                    entity_id,
                    target.clone(),
                    &form.text,
                    None,
                ));
            }

            if view.traits.compound && view.role.is_none() {
                let mut issue = ComplianceIssue::new(
                    rules::MISSING_AUXILIARY_TAG,
                    Severity::High,
                    IssueLayer::Form,
                    entity_id,
                    target.clone(),
                    format!("compound form '{}' has no auxiliary role tag", form.text),
                )
                .with_expected(
                    Auxiliary::ALL
                        .iter()
                        .map(|a| a.role_tag())
                        .collect::<Vec<_>>()
                        .join(" | "),
                );
                issue = match view.traits.leading_auxiliary {
                    Some(aux) => issue.with_auto_fix(AutoFix::AddTag {
                        tag: aux.role_tag().to_string(),
                    }),
                    None => issue.with_manual_step("Tag the form with the auxiliary it is built on"),
                };
                issues.push(issue);
            }

            let is_base = view
                .canonical_tags
                .iter()
                .any(|t| form_rules.building_block_moods.contains(t));
            if is_base && !view.canonical_tags.contains(&form_rules.building_block_tag) {
                issues.push(
                    ComplianceIssue::new(
                        rules::MISSING_BUILDING_BLOCK_TAG,
                        Severity::Medium,
                        IssueLayer::Form,
                        entity_id,
                        target.clone(),
                        format!("base form '{}' lacks the building-block marker", form.text),
                    )
                    .with_expected(form_rules.building_block_tag.clone())
                    .with_auto_fix(AutoFix::AddTag {
                        tag: form_rules.building_block_tag.clone(),
                    }),
                );
            }
        }
        issues
    }

    fn check_cross_references(
        &self,
        bundle: &EntityBundle,
        views: &HashMap<&str, FormView>,
    ) -> Vec<ComplianceIssue> {
        let entity_id = bundle.entity.id.as_str();
        let mut issues = Vec::new();

        for translation in &bundle.translations {
            let declared = translation.context.parsed_auxiliary();
            for form_id in translation.form_refs() {
                let Some(form) = bundle.form(form_id) else {
                    issues.push(
                        ComplianceIssue::new(
                            rules::ORPHANED_FORM_REFERENCE,
                            Severity::High,
                            IssueLayer::CrossReference,
                            entity_id,
                            IssueTarget::Translation(translation.id.clone()),
                            format!(
                                "translation '{}' references missing form '{}'",
                                translation.meaning, form_id
                            ),
                        )
                        .with_current(form_id.clone())
                        .with_auto_fix(AutoFix::RemoveFormReference {
                            form_id: form_id.clone(),
                        }),
                    );
                    continue;
                };

                let (Some(declared), Some(view)) = (declared, views.get(form_id.as_str())) else {
                    continue;
                };
                if !view.traits.compound {
                    continue;
                }
                if let Some(role) = view.role {
                    if role != declared {
                        issues.push(
                            ComplianceIssue::new(
                                rules::AUXILIARY_MISMATCH,
                                Severity::Critical,
                                IssueLayer::CrossReference,
                                entity_id,
                                IssueTarget::Form(form.id.clone()),
                                format!(
                                    "form '{}' is tagged {} but translation '{}' declares {}",
                                    form.text, role, translation.meaning, declared
                                ),
                            )
                            .with_current(role.role_tag())
                            .with_expected(declared.role_tag())
                            .with_auto_fix(AutoFix::ReplaceTag {
                                from: role.role_tag().to_string(),
                                to: declared.role_tag().to_string(),
                            })
                            .with_context(format!("declared by translation '{}'", translation.id)),
                        );
                    }
                }
            }
        }
        issues
    }

    fn check_building_blocks(&self, views: &HashMap<&str, FormView>) -> BuildingBlockReport {
        let present = |tags: &[String]| {
            views
                .values()
                .any(|v| tags.iter().all(|t| v.canonical_tags.contains(t)))
        };
        let checklist = &self.catalog.building_blocks;
        BuildingBlockReport {
            missing_base_forms: checklist
                .base_forms
                .iter()
                .filter(|f| !present(f.tags.as_slice()))
                .map(|f| f.name.clone())
                .collect(),
            missing_combinations: checklist
                .combinations
                .iter()
                .filter(|f| !present(f.tags.as_slice()))
                .map(|f| f.name.clone())
                .collect(),
        }
    }
}

/// Issues for an "exactly one of" requirement.
fn requirement_issues(
    requirement: &TagRequirement,
    tags: &[String],
    layer: IssueLayer,
    entity_id: &str,
    target: IssueTarget,
    label: &str,
    inferred: Option<&str>,
) -> Vec<ComplianceIssue> {
    if requirement.is_exempt(tags) {
        return Vec::new();
    }
    let found = requirement.matches(tags);
    match found.len() {
        1 => Vec::new(),
        0 => {
            let issue = ComplianceIssue::new(
                requirement.missing_rule.clone(),
                requirement.missing_severity,
                layer,
                entity_id,
                target,
                format!("'{}' has no {} tag", label, requirement.category),
            )
            .with_expected(requirement.tags.join(" | "));
            let issue = match inferred {
                Some(tag) => issue
                    .with_auto_fix(AutoFix::AddTag { tag: tag.to_string() })
                    .with_context("inferred from the text suffix"),
                None => issue.with_manual_step(format!("Assign exactly one {} tag", requirement.category)),
            };
            vec![issue]
        }
        _ => vec![ComplianceIssue::new(
            requirement.multiple_rule.clone(),
            requirement.multiple_severity,
            layer,
            entity_id,
            target,
            format!("'{}' has {} {} tags", label, found.len(), requirement.category),
        )
        .with_current(found.join(", "))
        .with_expected(format!("exactly one of {}", requirement.tags.join(" | ")))
        .with_manual_step(format!("Keep one {} tag and remove the others", requirement.category))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ComplianceStatus;
    use crate::logging::{MemoryLogger, NullLogger};
    use crate::model::{ContextMetadata, Dataset, Entity, Form};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn validator() -> ComplianceValidator {
        ComplianceValidator::new(RuleCatalog::default(), ValidatorConfig::default(), Arc::new(NullLogger))
            .unwrap()
    }

    /// A verb with every required form and no issues.
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
                Form::new(format!("{}-b{}", id, i), id, *text)
                    .with_tags(tags.iter().copied().chain(["building-block"])),
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

    fn rule_ids(issues: &[ComplianceIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.rule_id.as_str()).collect()
    }

    #[test]
    fn test_complete_verb_is_compliant() {
        let report = validator().validate_entity(&complete_verb("w1"), &mut LookupCache::new());
        let all: Vec<&str> = report.issues().map(|i| i.rule_id.as_str()).collect();
        assert!(all.is_empty(), "unexpected issues: {:?}", all);
        assert_eq!(report.status, ComplianceStatus::Compliant);
        assert_eq!(report.score, 100);
        assert!(report.migration_ready);
        assert!(report.building_blocks.as_ref().unwrap().is_complete());
        assert_eq!(report.deprecated.as_ref().unwrap().total(), 0);
    }

    #[test]
    fn test_no_translations_is_single_critical() {
        let mut bundle = complete_verb("w1");
        bundle.translations.clear();
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(report.translation_issues.len(), 1);
        let issue = &report.translation_issues[0];
        assert_eq!(issue.rule_id, rules::NO_TRANSLATIONS);
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(report.status, ComplianceStatus::BlocksMigration);
    }

    #[test]
    fn test_missing_class_inferred_from_suffix() {
        let mut bundle = complete_verb("w1");
        bundle.entity.tags = vec!["transitive-verb".into()];
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(rule_ids(&report.entity_issues), vec![rules::MISSING_CONJUGATION_CLASS]);
        assert_eq!(
            report.entity_issues[0].auto_fix,
            Some(AutoFix::AddTag {
                tag: "are-verb".into()
            })
        );
        assert!(!report.migration_ready);
    }

    #[test]
    fn test_multiple_transitivity_is_manual() {
        let mut bundle = complete_verb("w1");
        bundle.entity.tags.push("intransitive-verb".into());
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(rule_ids(&report.entity_issues), vec![rules::MULTIPLE_TRANSITIVITY]);
        assert!(!report.entity_issues[0].is_auto_fixable());
        assert_eq!(report.status, ComplianceStatus::NeedsWork);
    }

    #[test]
    fn test_legacy_mood_reports_only_terminology() {
        let mut bundle = complete_verb("w1");
        bundle.forms[3].tags = vec!["indicative".into(), "presente".into(), "io".into(), "singolare".into()];
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(
            rule_ids(&report.form_issues),
            vec![rules::LEGACY_TERMINOLOGY, rules::LEGACY_TERMINOLOGY]
        );
        assert!(report.form_issues.iter().all(|i| i.severity == Severity::Critical));
        assert_eq!(
            report.form_issues[0].auto_fix,
            Some(AutoFix::ReplaceTag {
                from: "indicative".into(),
                to: "indicativo".into()
            })
        );
        assert!(report.building_blocks.unwrap().is_complete());
    }

    #[test]
    fn test_shared_canonical_target_is_removed_not_replaced() {
        let mut bundle = complete_verb("w1");
        bundle.forms[3].tags = vec![
            "indicativo".into(),
            "presente".into(),
            "lui".into(),
            "lei".into(),
            "singolare".into(),
        ];
        bundle.forms[4].tags.push("lui".into());
        bundle.forms[4].tags.push("terza-persona".into());
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        let fixes: Vec<(&str, Option<&AutoFix>)> = report
            .form_issues
            .iter()
            .filter(|i| i.rule_id == rules::LEGACY_TERMINOLOGY)
            .map(|i| (i.target.id(), i.auto_fix.as_ref()))
            .collect();
        let f3 = bundle.forms[3].id.as_str();
        let f4 = bundle.forms[4].id.as_str();
        assert_eq!(
            fixes,
            vec![
                (
                    f3,
                    Some(&AutoFix::ReplaceTag {
                        from: "lui".into(),
                        to: "terza-persona".into()
                    })
                ),
                (f3, Some(&AutoFix::RemoveTag { tag: "lei".into() })),
                (f4, Some(&AutoFix::RemoveTag { tag: "lui".into() })),
            ]
        );
    }

    #[test]
    fn test_missing_mood_and_exempt_tense() {
        let catalog = RuleCatalog::default();
        let bundle = EntityBundle::new(Entity::new("w1", "parlare", "verb").with_tags(["are-verb", "transitive-verb"]))
            .with_translation(
                Translation::new("t1", "w1", "to speak")
                    .with_context(ContextMetadata::new().with_auxiliary("avere"))
                    .with_form_ids(["f1", "f2"]),
            )
            .with_form(Form::new("f1", "w1", "parla").with_tags(["imperativo", "seconda-persona", "singolare"]))
            .with_form(Form::new("f2", "w1", "parlavo").with_tags(["imperfetto"]));
        let v = ComplianceValidator::new(
            catalog,
            ValidatorConfig::default().with_building_blocks(false),
            Arc::new(NullLogger),
        )
        .unwrap();
        let report = v.validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(rule_ids(&report.form_issues), vec![rules::MISSING_MOOD]);
        assert_eq!(report.form_issues[0].target, IssueTarget::Form("f2".into()));
        assert!(report.building_blocks.is_none());
    }

    #[test]
    fn test_compound_form_needs_auxiliary_tag() {
        let mut bundle = complete_verb("w1");
        let idx = bundle.forms.iter().position(|f| f.text == "ho parlato").unwrap();
        bundle.forms[idx].tags.retain(|t| t != "avere-auxiliary");
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(rule_ids(&report.form_issues), vec![rules::MISSING_AUXILIARY_TAG]);
        assert_eq!(
            report.form_issues[0].auto_fix,
            Some(AutoFix::AddTag {
                tag: "avere-auxiliary".into()
            })
        );
    }

    #[test]
    fn test_building_block_marker_required() {
        let mut bundle = complete_verb("w1");
        bundle.forms[0].tags.retain(|t| t != "building-block");
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());
        assert_eq!(rule_ids(&report.form_issues), vec![rules::MISSING_BUILDING_BLOCK_TAG]);
        assert!(report.form_issues[0].is_auto_fixable());
    }

    #[test]
    fn test_missing_auxiliary_inferred_from_compound_form() {
        let bundle = EntityBundle::new(Entity::new("w1", "andare", "verb").with_tags(["are-verb", "intransitive-verb"]))
            .with_translation(Translation::new("t1", "w1", "to go").with_form_ids(["f1"]))
            .with_form(Form::new("f1", "w1", "sono andato").with_tags([
                "indicativo",
                "passato-prossimo",
                "prima-persona",
                "singolare",
                "essere-auxiliary",
            ]));
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        assert_eq!(rule_ids(&report.translation_issues), vec![rules::MISSING_AUXILIARY]);
        assert_eq!(
            report.translation_issues[0].auto_fix,
            Some(AutoFix::SetMetadata {
                key: "auxiliary".into(),
                value: "essere".into()
            })
        );
    }

    #[test]
    fn test_invalid_auxiliary_and_missing_form_ids() {
        let mut bundle = complete_verb("w1");
        bundle.translations[0].context.auxiliary = Some("volere".into());
        bundle.translations[0].form_ids = None;
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());
        assert_eq!(
            rule_ids(&report.translation_issues),
            vec![rules::INVALID_AUXILIARY, rules::MISSING_FORM_IDS]
        );
        assert_eq!(report.translation_issues[0].current_value.as_deref(), Some("volere"));
    }

    #[test]
    fn test_cross_reference_orphan_and_mismatch() {
        let mut bundle = complete_verb("w1");
        bundle.translations[0].context = ContextMetadata::new().with_auxiliary("essere");
        bundle.translations[0]
            .form_ids
            .as_mut()
            .unwrap()
            .push("ghost".into());
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        let orphans: Vec<_> = report
            .cross_reference_issues
            .iter()
            .filter(|i| i.rule_id == rules::ORPHANED_FORM_REFERENCE)
            .collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(
            orphans[0].auto_fix,
            Some(AutoFix::RemoveFormReference {
                form_id: "ghost".into()
            })
        );

        let mismatches: Vec<_> = report
            .cross_reference_issues
            .iter()
            .filter(|i| i.rule_id == rules::AUXILIARY_MISMATCH)
            .collect();
        assert_eq!(mismatches.len(), 3);
        assert!(mismatches.iter().all(|i| i.severity == Severity::Critical));
        assert_eq!(mismatches[0].expected_value.as_deref(), Some("essere-auxiliary"));
    }

    #[test]
    fn test_cross_references_can_be_disabled() {
        let mut bundle = complete_verb("w1");
        bundle.translations[0].form_ids.as_mut().unwrap().push("ghost".into());
        let v = ComplianceValidator::new(
            RuleCatalog::default(),
            ValidatorConfig::default().with_cross_references(false),
            Arc::new(NullLogger),
        )
        .unwrap();
        let report = v.validate_entity(&bundle, &mut LookupCache::new());
        assert!(report.cross_reference_issues.is_empty());
    }

    #[test]
    fn test_building_block_gaps_reported_by_name() {
        let mut bundle = complete_verb("w1");
        bundle.forms.retain(|f| !f.has_tag("gerundio") && !f.has_tag("congiuntivo"));
        bundle.translations[0].form_ids = Some(bundle.forms.iter().map(|f| f.id.clone()).collect());
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        let blocks = report.building_blocks.as_ref().unwrap();
        assert_eq!(blocks.missing_base_forms, vec!["present-gerund"]);
        assert_eq!(blocks.missing_combinations.len(), 3);
        assert!(blocks
            .missing_combinations
            .contains(&"congiuntivo presente terza-persona".to_string()));
        assert!(report.issues().next().is_none());
    }

    #[test]
    fn test_deprecated_content_counted_not_flagged() {
        let mut bundle = complete_verb("w1");
        let base = bundle.forms[4].clone();
        let mut negated = base.clone();
        negated.id = "neg".into();
        negated.text = "non parlo".into();
        let mut clitic = base;
        clitic.id = "clitic".into();
        clitic.text = "parlamelo".into();
        bundle.forms.push(negated);
        bundle.forms.push(clitic);
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());

        let deprecated = report.deprecated.as_ref().unwrap();
        assert_eq!(deprecated.counts.get("negation"), Some(&1));
        assert_eq!(deprecated.counts.get("multi-clitic"), Some(&1));
        assert!(report.issues().next().is_none());
    }

    #[test]
    fn test_non_catalog_category_only_checks_translations() {
        let bundle = EntityBundle::new(Entity::new("n1", "casa", "noun"))
            .with_form(Form::new("f1", "n1", "case").with_tags(["plural"]));
        let report = validator().validate_entity(&bundle, &mut LookupCache::new());
        assert_eq!(rule_ids(&report.translation_issues), vec![rules::NO_TRANSLATIONS]);
        assert_eq!(rule_ids(&report.form_issues), vec![rules::LEGACY_TERMINOLOGY]);
        assert!(report.entity_issues.is_empty());
        assert!(!report.notes.is_empty());
    }

    #[test]
    fn test_validate_system_collects_load_errors() {
        let dataset = Dataset::new()
            .with_bundle(complete_verb("w1"))
            .with_bundle(complete_verb("w2"))
            .with_bundle(EntityBundle::new(Entity::new("w3", "avere", "verb")));
        let store = MemoryStore::new(dataset).unreadable("w2");
        let logger = MemoryLogger::new();
        let mut v = ComplianceValidator::new(
            RuleCatalog::default(),
            ValidatorConfig::default(),
            Arc::new(logger.clone()),
        )
        .unwrap();
        let mut cache = LookupCache::new();

        let report = v.validate_system(&store, &mut cache).unwrap();
        assert_eq!(report.total_entities, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].entity_id, "w2");
        assert_eq!(report.distribution.compliant, 1);
        assert_eq!(report.distribution.blocks_migration, 1);
        assert!(!report.readiness.ready);
        assert_eq!(logger.events("validation.entity_load_failed").len(), 1);

        // A second run starts from an empty buffer and reuses cached text traits.
        let misses = cache.misses();
        let again = v.validate_system(&store, &mut cache).unwrap();
        assert_eq!(v.results().len(), 2);
        assert_eq!(again.total_entities, 2);
        assert_eq!(cache.misses(), misses);
        assert!(cache.hits() > 0);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut catalog = RuleCatalog::default();
        catalog.form.compound_pattern = "(unclosed".into();
        let result = ComplianceValidator::new(catalog, ValidatorConfig::default(), Arc::new(NullLogger));
        assert!(matches!(result, Err(Error::InvalidCatalog(_))));
    }
}
