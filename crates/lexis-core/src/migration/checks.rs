//! Named validation checks.
//!
//! [`ValidationCheck`]s guard a single recommendation; [`SystemCheck`]s run
//! once per plan, before execution and as success criteria afterwards.
//! All checks are read-only.

use crate::error::StoreError;
use crate::model::Table;
use crate::recommendation::{MigrationPlan, RecommendationCategory};
use crate::store::EntityReader;
use crate::terminology::TerminologyConverter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A per-recommendation check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "kebab-case")]
pub enum ValidationCheck {
    /// The entity row exists.
    EntityExists {
        /// Entity id.
        entity_id: String,
    },
    /// The translation row exists.
    TranslationExists {
        /// Translation id.
        translation_id: String,
    },
    /// The form row exists.
    FormExists {
        /// Form id.
        form_id: String,
    },
    /// The form carries a tag.
    FormHasTag {
        /// Form id.
        form_id: String,
        /// Tag.
        tag: String,
    },
    /// The form does not carry a tag.
    FormLacksTag {
        /// Form id.
        form_id: String,
        /// Tag.
        tag: String,
    },
    /// The entity carries a tag.
    EntityHasTag {
        /// Entity id.
        entity_id: String,
        /// Tag.
        tag: String,
    },
    /// The translation's context holds a key, optionally with a given value.
    TranslationHasMetadata {
        /// Translation id.
        translation_id: String,
        /// Key.
        key: String,
        /// Expected value; any value passes when absent.
        value: Option<String>,
    },
}

impl ValidationCheck {
    /// Check name.
    pub fn name(&self) -> &'static str {
        match self {
            ValidationCheck::EntityExists { .. } => "entity-exists",
            ValidationCheck::TranslationExists { .. } => "translation-exists",
            ValidationCheck::FormExists { .. } => "form-exists",
            ValidationCheck::FormHasTag { .. } => "form-has-tag",
            ValidationCheck::FormLacksTag { .. } => "form-lacks-tag",
            ValidationCheck::EntityHasTag { .. } => "entity-has-tag",
            ValidationCheck::TranslationHasMetadata { .. } => "translation-has-metadata",
        }
    }

    /// Build a check that only needs the row id, by name.
    pub fn existence(name: &str, table: Table, id: &str) -> Option<Self> {
        match (name, table) {
            ("entity-exists", Table::Words) | ("target-exists", Table::Words) => {
                Some(ValidationCheck::EntityExists {
                    entity_id: id.to_string(),
                })
            }
            ("form-exists", Table::WordForms) | ("target-exists", Table::WordForms) => {
                Some(ValidationCheck::FormExists {
                    form_id: id.to_string(),
                })
            }
            ("translation-exists", Table::WordTranslations)
            | ("target-exists", Table::WordTranslations) => Some(ValidationCheck::TranslationExists {
                translation_id: id.to_string(),
            }),
            _ => None,
        }
    }

    /// Evaluate the check.
    pub fn evaluate<R>(&self, reader: &R) -> Result<bool, StoreError>
    where
        R: EntityReader + ?Sized,
    {
        Ok(match self {
            ValidationCheck::EntityExists { entity_id } => reader.entity(entity_id)?.is_some(),
            ValidationCheck::TranslationExists { translation_id } => {
                reader.translation(translation_id)?.is_some()
            }
            ValidationCheck::FormExists { form_id } => reader.form(form_id)?.is_some(),
            ValidationCheck::FormHasTag { form_id, tag } => {
                reader.form(form_id)?.is_some_and(|f| f.has_tag(tag))
            }
            ValidationCheck::FormLacksTag { form_id, tag } => {
                reader.form(form_id)?.is_some_and(|f| !f.has_tag(tag))
            }
            ValidationCheck::EntityHasTag { entity_id, tag } => {
                reader.entity(entity_id)?.is_some_and(|e| e.has_tag(tag))
            }
            ValidationCheck::TranslationHasMetadata {
                translation_id,
                key,
                value,
            } => match reader.translation(translation_id)? {
                Some(t) => match (t.context.get(key), value) {
                    (Some(found), Some(expected)) => found == *expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                },
                None => false,
            },
        })
    }
}

impl std::fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationCheck::EntityExists { entity_id } => write!(f, "entity-exists({})", entity_id),
            ValidationCheck::TranslationExists { translation_id } => {
                write!(f, "translation-exists({})", translation_id)
            }
            ValidationCheck::FormExists { form_id } => write!(f, "form-exists({})", form_id),
            ValidationCheck::FormHasTag { form_id, tag } => {
                write!(f, "form-has-tag({}, {})", form_id, tag)
            }
            ValidationCheck::FormLacksTag { form_id, tag } => {
                write!(f, "form-lacks-tag({}, {})", form_id, tag)
            }
            ValidationCheck::EntityHasTag { entity_id, tag } => {
                write!(f, "entity-has-tag({}, {})", entity_id, tag)
            }
            ValidationCheck::TranslationHasMetadata {
                translation_id,
                key,
                value,
            } => match value {
                Some(v) => write!(f, "translation-has-metadata({}, {}={})", translation_id, key, v),
                None => write!(f, "translation-has-metadata({}, {})", translation_id, key),
            },
        }
    }
}

/// A plan-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemCheck {
    /// The store answers queries.
    StoreReachable,
    /// Every row a statement targets exists.
    TargetsExist,
    /// No form of a planned entity carries a legacy term.
    NoLegacyTerminology,
    /// Every translation the plan assigns an auxiliary to has a valid one.
    AuxiliariesAssigned,
    /// Every form reference of a planned entity resolves.
    FormReferencesResolve,
}

/// Result of a [`SystemCheck`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// The check.
    pub check: SystemCheck,
    /// Whether it passed.
    pub passed: bool,
    /// Failure detail.
    pub detail: Option<String>,
}

impl CheckOutcome {
    fn pass(check: SystemCheck) -> Self {
        Self {
            check,
            passed: true,
            detail: None,
        }
    }

    fn fail(check: SystemCheck, detail: String) -> Self {
        Self {
            check,
            passed: false,
            detail: Some(detail),
        }
    }
}

impl SystemCheck {
    /// Check name.
    pub fn name(&self) -> &'static str {
        match self {
            SystemCheck::StoreReachable => "store-reachable",
            SystemCheck::TargetsExist => "targets-exist",
            SystemCheck::NoLegacyTerminology => "no-legacy-terminology",
            SystemCheck::AuxiliariesAssigned => "auxiliaries-assigned",
            SystemCheck::FormReferencesResolve => "form-references-resolve",
        }
    }

    /// Evaluate the check against a plan.
    pub fn evaluate<R>(&self, reader: &R, plan: &MigrationPlan) -> Result<CheckOutcome, StoreError>
    where
        R: EntityReader + ?Sized,
    {
        let check = *self;
        match self {
            SystemCheck::StoreReachable => match reader.row_count(Table::Words) {
                Ok(_) => Ok(CheckOutcome::pass(check)),
                Err(e) => Ok(CheckOutcome::fail(check, e.to_string())),
            },
            SystemCheck::TargetsExist => {
                let mut missing = Vec::new();
                for statement in plan.recommendations().flat_map(|r| r.forward.iter()) {
                    let exists = match statement.table {
                        Table::Words => reader.entity(&statement.target_id)?.is_some(),
                        Table::WordTranslations => reader.translation(&statement.target_id)?.is_some(),
                        Table::WordForms => reader.form(&statement.target_id)?.is_some(),
                        Table::FormTranslations => false,
                    };
                    if !exists {
                        missing.push(format!("{}:{}", statement.table, statement.target_id));
                    }
                }
                Ok(outcome(check, missing))
            }
            SystemCheck::NoLegacyTerminology => {
                let converter = TerminologyConverter::new();
                let mut offending = Vec::new();
                for entity_id in plan_entities(plan) {
                    let bundle = reader.bundle(&entity_id)?;
                    for form in &bundle.forms {
                        if !converter.legacy_tags(&form.tags).is_empty() {
                            offending.push(form.id.clone());
                        }
                    }
                }
                Ok(outcome(check, offending))
            }
            SystemCheck::AuxiliariesAssigned => {
                let mut unassigned = Vec::new();
                let targets: BTreeSet<&str> = plan
                    .recommendations()
                    .filter(|r| r.category == RecommendationCategory::AuxiliaryAssignment)
                    .flat_map(|r| r.forward.iter())
                    .filter(|s| s.table == Table::WordTranslations)
                    .map(|s| s.target_id.as_str())
                    .collect();
                for id in targets {
                    let assigned = reader
                        .translation(id)?
                        .and_then(|t| t.context.parsed_auxiliary())
                        .is_some();
                    if !assigned {
                        unassigned.push(id.to_string());
                    }
                }
                Ok(outcome(check, unassigned))
            }
            SystemCheck::FormReferencesResolve => {
                let mut dangling = Vec::new();
                for entity_id in plan_entities(plan) {
                    let bundle = reader.bundle(&entity_id)?;
                    for translation in &bundle.translations {
                        for form_id in translation.form_refs() {
                            if bundle.form(form_id).is_none() {
                                dangling.push(format!("{}->{}", translation.id, form_id));
                            }
                        }
                    }
                }
                Ok(outcome(check, dangling))
            }
        }
    }
}

impl std::fmt::Display for SystemCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn outcome(check: SystemCheck, offending: Vec<String>) -> CheckOutcome {
    if offending.is_empty() {
        CheckOutcome::pass(check)
    } else {
        CheckOutcome::fail(check, format!("{} failing: {}", offending.len(), offending.join(", ")))
    }
}

/// Entity ids touched by a plan.
fn plan_entities(plan: &MigrationPlan) -> BTreeSet<String> {
    plan.recommendations().map(|r| r.entity_id.clone()).collect()
}
