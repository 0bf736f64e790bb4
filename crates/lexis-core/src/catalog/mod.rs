//! Rule catalog for compliance validation.
//!
//! The catalog describes required tag categories per layer and the patterns
//! the validator matches against form text.

mod catalog;
pub mod rules;

pub use catalog::{
    BuildingBlockRules, DeprecatedPattern, EntityRules, FormRules, RequiredForm, RuleCatalog,
    ScoringRules, SuffixRule, TagRequirement, TranslationRules,
};
