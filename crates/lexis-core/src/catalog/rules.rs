//! Rule identifiers and their impact descriptions.
//!
//! Rule ids are the join key between the catalog, the validator's issues and
//! the recommendation handler registry.

/// Entity has no conjugation class tag.
pub const MISSING_CONJUGATION_CLASS: &str = "missing-conjugation-class";
/// Entity has more than one conjugation class tag.
pub const MULTIPLE_CONJUGATION_CLASSES: &str = "multiple-conjugation-classes";
/// Entity has no transitivity tag.
pub const MISSING_TRANSITIVITY: &str = "missing-transitivity";
/// Entity has more than one transitivity tag.
pub const MULTIPLE_TRANSITIVITY: &str = "multiple-transitivity";
/// Entity has no translations at all.
pub const NO_TRANSLATIONS: &str = "no-translations";
/// Translation lacks the auxiliary context key.
pub const MISSING_AUXILIARY: &str = "missing-auxiliary";
/// Translation declares an auxiliary outside the allowed set.
pub const INVALID_AUXILIARY: &str = "invalid-auxiliary";
/// Translation has no form references.
pub const MISSING_FORM_IDS: &str = "missing-form-ids";
/// Form has no mood tag.
pub const MISSING_MOOD: &str = "missing-mood";
/// Form has more than one mood tag.
pub const MULTIPLE_MOODS: &str = "multiple-moods";
/// Form has no tense tag.
pub const MISSING_TENSE: &str = "missing-tense";
/// Form has more than one tense tag.
pub const MULTIPLE_TENSES: &str = "multiple-tenses";
/// Form still uses a legacy term.
pub const LEGACY_TERMINOLOGY: &str = "legacy-terminology";
/// Compound form has no auxiliary role tag.
pub const MISSING_AUXILIARY_TAG: &str = "missing-auxiliary-tag";
/// Base form lacks the building-block marker.
pub const MISSING_BUILDING_BLOCK_TAG: &str = "missing-building-block-tag";
/// Translation references a form that does not exist.
pub const ORPHANED_FORM_REFERENCE: &str = "orphaned-form-reference";
/// Compound form auxiliary contradicts the translation's auxiliary.
pub const AUXILIARY_MISMATCH: &str = "auxiliary-mismatch";

/// Static impact description for a rule id.
pub fn impact_description(rule_id: &str) -> &'static str {
    match rule_id {
        MISSING_CONJUGATION_CLASS => "Conjugation cannot be generated or checked without a class",
        MULTIPLE_CONJUGATION_CLASSES => "Conflicting classes produce ambiguous conjugation tables",
        MISSING_TRANSITIVITY => "Auxiliary selection and object handling are undetermined",
        MULTIPLE_TRANSITIVITY => "Conflicting transitivity markers confuse auxiliary selection",
        NO_TRANSLATIONS => "Entity is invisible to learners and cannot be migrated",
        MISSING_AUXILIARY => "Compound tenses cannot be built for this meaning",
        INVALID_AUXILIARY => "Auxiliary value is not recognized by downstream consumers",
        MISSING_FORM_IDS => "Meaning is not connected to any realized form",
        MISSING_MOOD => "Form cannot be placed in a conjugation table",
        MULTIPLE_MOODS => "Form appears in more than one conjugation table",
        MISSING_TENSE => "Form cannot be placed in a tense column",
        MULTIPLE_TENSES => "Form appears under more than one tense",
        LEGACY_TERMINOLOGY => "Legacy terms split queries across two vocabularies",
        MISSING_AUXILIARY_TAG => "Compound form cannot be matched to its auxiliary",
        MISSING_BUILDING_BLOCK_TAG => "Base form is not available for compound derivation",
        ORPHANED_FORM_REFERENCE => "Translation points at a form that no longer exists",
        AUXILIARY_MISMATCH => "Translation and form disagree on the auxiliary",
        _ => "Custom rule violation",
    }
}
