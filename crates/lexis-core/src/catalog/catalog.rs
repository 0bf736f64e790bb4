//! Versioned rule catalog.
//!
//! The catalog is pure data: which tag categories each layer requires, which
//! patterns mark compound and deprecated forms, and which base forms a
//! complete entity must carry. The validator interprets it; replacing the
//! catalog never changes validator control flow.

use super::rules;
use crate::compliance::Severity;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// "Exactly one tag from this set" requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRequirement {
    /// Category name, used in messages ("mood", "tense", ...).
    pub category: String,
    /// Allowed tags; exactly one must be present.
    pub tags: Vec<String>,
    /// Rule id raised when none is present.
    pub missing_rule: String,
    /// Severity when none is present.
    pub missing_severity: Severity,
    /// Rule id raised when more than one is present.
    pub multiple_rule: String,
    /// Severity when more than one is present.
    pub multiple_severity: Severity,
    /// Records carrying any of these tags are exempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exempt_tags: Vec<String>,
}

impl TagRequirement {
    /// Whether a tag set is exempt from this requirement.
    pub fn is_exempt(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.exempt_tags.contains(t))
    }

    /// Tags from the allowed set that appear in `tags`.
    pub fn matches<'a>(&self, tags: &'a [String]) -> Vec<&'a str> {
        tags.iter()
            .filter(|t| self.tags.contains(t))
            .map(String::as_str)
            .collect()
    }
}

/// Suffix heuristic used to infer a classification tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixRule {
    /// Text suffix, e.g. "are".
    pub suffix: String,
    /// Tag to infer, e.g. "are-verb".
    pub tag: String,
}

/// Entity-level rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRules {
    /// Entity categories these rules apply to.
    pub categories: Vec<String>,
    /// Primary classification (e.g. conjugation class).
    pub classification: TagRequirement,
    /// Secondary classification (e.g. transitivity potential).
    pub secondary: TagRequirement,
    /// Suffix heuristics for the primary classification, longest first.
    pub suffix_rules: Vec<SuffixRule>,
}

/// Translation-level rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRules {
    /// Context key every translation must carry.
    pub required_metadata_key: String,
    /// Allowed values for that key.
    pub allowed_values: Vec<String>,
    /// Value suggested when the key is missing and nothing better is known.
    pub default_value: String,
    /// Whether a non-empty form reference array is required.
    pub require_form_ids: bool,
}

/// Form-level rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRules {
    /// Category sets each form must carry exactly one tag from.
    pub required: Vec<TagRequirement>,
    /// Regex matching auxiliary+content text.
    pub compound_pattern: String,
    /// Auxiliary word forms of "avere", used to infer a role tag.
    pub avere_forms: Vec<String>,
    /// Auxiliary word forms of "essere", used to infer a role tag.
    pub essere_forms: Vec<String>,
    /// Tags marking a base form (participle, gerund, infinitive).
    pub building_block_moods: Vec<String>,
    /// Marker tag required on base forms.
    pub building_block_tag: String,
}

/// A required form, described by the tags it must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredForm {
    /// Name used in reports.
    pub name: String,
    /// Tags that must all be present on one form.
    pub tags: Vec<String>,
}

impl RequiredForm {
    /// Create a required form from a tag list, naming it by its tags.
    pub fn from_tags(tags: &[&str]) -> Self {
        Self {
            name: tags.join(" "),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Building-block completeness checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingBlockRules {
    /// Base forms every entity must have.
    pub base_forms: Vec<RequiredForm>,
    /// Mood/tense/person combinations every entity must have.
    pub combinations: Vec<RequiredForm>,
}

/// Pattern marking content that is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecatedPattern {
    /// Pattern name.
    pub name: String,
    /// Regex matched against form text.
    pub pattern: String,
}

/// Scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Weighted issue count at which the score reaches zero.
    pub max_issue_budget: u32,
    /// High-severity count above which status is critical-issues.
    pub critical_issues_high_threshold: usize,
    /// Maximum high-severity count that still allows migration.
    pub readiness_max_high: usize,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            max_issue_budget: 20,
            critical_issues_high_threshold: 2,
            readiness_max_high: 1,
        }
    }
}

/// The complete rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCatalog {
    /// Catalog version.
    pub version: u32,
    /// Entity-level rules.
    pub entity: EntityRules,
    /// Translation-level rules.
    pub translation: TranslationRules,
    /// Form-level rules.
    pub form: FormRules,
    /// Building-block checklist.
    pub building_blocks: BuildingBlockRules,
    /// Out-of-scope content patterns.
    pub deprecated: Vec<DeprecatedPattern>,
    /// Scoring constants.
    #[serde(default)]
    pub scoring: ScoringRules,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleCatalog {
    fn default() -> Self {
        let persons = ["prima-persona", "seconda-persona", "terza-persona"];
        let tensed = [
            ["indicativo", "presente"],
            ["indicativo", "passato-prossimo"],
            ["indicativo", "imperfetto"],
            ["indicativo", "futuro-semplice"],
            ["congiuntivo", "presente"],
            ["condizionale", "presente"],
        ];
        let combinations = tensed
            .iter()
            .flat_map(|[mood, tense]| {
                persons
                    .iter()
                    .map(move |person| RequiredForm::from_tags(&[*mood, *tense, *person]))
            })
            .collect();

        Self {
            version: 1,
            entity: EntityRules {
                categories: strings(&["verb"]),
                classification: TagRequirement {
                    category: "conjugation class".into(),
                    tags: strings(&["are-verb", "ere-verb", "ire-verb", "ire-isc-verb"]),
                    missing_rule: rules::MISSING_CONJUGATION_CLASS.into(),
                    missing_severity: Severity::Critical,
                    multiple_rule: rules::MULTIPLE_CONJUGATION_CLASSES.into(),
                    multiple_severity: Severity::High,
                    exempt_tags: Vec::new(),
                },
                secondary: TagRequirement {
                    category: "transitivity".into(),
                    tags: strings(&[
                        "transitive-verb",
                        "intransitive-verb",
                        "both-transitive-intransitive",
                    ]),
                    missing_rule: rules::MISSING_TRANSITIVITY.into(),
                    missing_severity: Severity::High,
                    multiple_rule: rules::MULTIPLE_TRANSITIVITY.into(),
                    multiple_severity: Severity::Medium,
                    exempt_tags: Vec::new(),
                },
                suffix_rules: vec![
                    SuffixRule {
                        suffix: "are".into(),
                        tag: "are-verb".into(),
                    },
                    SuffixRule {
                        suffix: "ere".into(),
                        tag: "ere-verb".into(),
                    },
                    SuffixRule {
                        suffix: "rre".into(),
                        tag: "ere-verb".into(),
                    },
                    SuffixRule {
                        suffix: "ire".into(),
                        tag: "ire-verb".into(),
                    },
                ],
            },
            translation: TranslationRules {
                required_metadata_key: "auxiliary".into(),
                allowed_values: strings(&["avere", "essere"]),
                default_value: "avere".into(),
                require_form_ids: true,
            },
            form: FormRules {
                required: vec![
                    TagRequirement {
                        category: "mood".into(),
                        tags: strings(&[
                            "indicativo",
                            "congiuntivo",
                            "condizionale",
                            "imperativo",
                            "infinito",
                            "participio",
                            "gerundio",
                        ]),
                        missing_rule: rules::MISSING_MOOD.into(),
                        missing_severity: Severity::High,
                        multiple_rule: rules::MULTIPLE_MOODS.into(),
                        multiple_severity: Severity::High,
                        exempt_tags: Vec::new(),
                    },
                    TagRequirement {
                        category: "tense".into(),
                        tags: strings(&[
                            "presente",
                            "passato",
                            "passato-prossimo",
                            "imperfetto",
                            "trapassato-prossimo",
                            "passato-remoto",
                            "trapassato-remoto",
                            "futuro-semplice",
                            "futuro-anteriore",
                        ]),
                        missing_rule: rules::MISSING_TENSE.into(),
                        missing_severity: Severity::Medium,
                        multiple_rule: rules::MULTIPLE_TENSES.into(),
                        multiple_severity: Severity::Medium,
                        exempt_tags: strings(&["imperativo"]),
                    },
                ],
                compound_pattern: r"^(?i)(ho|hai|ha|abbiamo|avete|hanno|avevo|avevi|aveva|avevamo|avevate|avevano|avrò|avrai|avrà|avremo|avrete|avranno|abbia|abbiate|abbiano|avrei|avresti|avrebbe|sono|sei|è|siamo|siete|ero|eri|era|eravamo|eravate|erano|sarò|sarai|sarà|saremo|sarete|saranno|sia|siate|siano|sarei|saresti|sarebbe)\s+\S+$".into(),
                avere_forms: strings(&[
                    "ho", "hai", "ha", "abbiamo", "avete", "hanno", "avevo", "avevi", "aveva",
                    "avevamo", "avevate", "avevano", "avrò", "avrai", "avrà", "avremo", "avrete",
                    "avranno", "abbia", "abbiate", "abbiano", "avrei", "avresti", "avrebbe",
                ]),
                essere_forms: strings(&[
                    "sono", "sei", "è", "siamo", "siete", "ero", "eri", "era", "eravamo",
                    "eravate", "erano", "sarò", "sarai", "sarà", "saremo", "sarete", "saranno",
                    "sia", "siate", "siano", "sarei", "saresti", "sarebbe",
                ]),
                building_block_moods: strings(&["participio", "gerundio", "infinito"]),
                building_block_tag: "building-block".into(),
            },
            building_blocks: BuildingBlockRules {
                base_forms: vec![
                    RequiredForm {
                        name: "past-participle".into(),
                        tags: strings(&["participio", "passato"]),
                    },
                    RequiredForm {
                        name: "present-gerund".into(),
                        tags: strings(&["gerundio", "presente"]),
                    },
                    RequiredForm {
                        name: "present-infinitive".into(),
                        tags: strings(&["infinito", "presente"]),
                    },
                ],
                combinations,
            },
            deprecated: vec![
                DeprecatedPattern {
                    name: "negation".into(),
                    pattern: r"^(?i)non\s".into(),
                },
                DeprecatedPattern {
                    name: "multi-clitic".into(),
                    pattern: r"(?i)\w{2,}(me|te|se|ce|ve|glie)(lo|la|li|le|ne)$".into(),
                },
            ],
            scoring: ScoringRules::default(),
        }
    }
}

impl RuleCatalog {
    /// Parse a catalog from JSON and check it.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidCatalog(e.to_string()))?;
        catalog.check()?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize the catalog as pretty JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Structural checks that serde cannot express.
    pub fn check(&self) -> Result<(), Error> {
        let requirements = [&self.entity.classification, &self.entity.secondary]
            .into_iter()
            .chain(self.form.required.iter());
        for req in requirements {
            if req.tags.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "requirement '{}' has no allowed tags",
                    req.category
                )));
            }
        }
        if self.translation.allowed_values.is_empty() {
            return Err(Error::InvalidCatalog(
                "translation rules allow no metadata values".into(),
            ));
        }
        if self.scoring.max_issue_budget == 0 {
            return Err(Error::InvalidCatalog("max issue budget must be positive".into()));
        }
        Ok(())
    }

    /// Whether entity-level rules apply to an entity category.
    pub fn applies_to(&self, category: &str) -> bool {
        self.entity.categories.iter().any(|c| c == category)
    }

    /// Infer the primary classification tag from an entity's text.
    pub fn infer_classification(&self, text: &str) -> Option<&str> {
        let lowered = text.trim().to_lowercase();
        self.entity
            .suffix_rules
            .iter()
            .find(|rule| lowered.ends_with(&rule.suffix))
            .map(|rule| rule.tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = RuleCatalog::default();
        assert!(catalog.check().is_ok());
        assert_eq!(catalog.building_blocks.base_forms.len(), 3);
        assert_eq!(catalog.building_blocks.combinations.len(), 18);
        assert!(catalog.applies_to("verb"));
        assert!(!catalog.applies_to("noun"));
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let catalog = RuleCatalog::default();
        let json = catalog.to_json().unwrap();
        let parsed = RuleCatalog::from_json(&json).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_empty_requirement_rejected() {
        let mut catalog = RuleCatalog::default();
        catalog.form.required[0].tags.clear();
        let json = catalog.to_json().unwrap();
        assert!(matches!(
            RuleCatalog::from_json(&json),
            Err(Error::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_infer_classification_by_suffix() {
        let catalog = RuleCatalog::default();
        assert_eq!(catalog.infer_classification("parlare"), Some("are-verb"));
        assert_eq!(catalog.infer_classification("Credere"), Some("ere-verb"));
        assert_eq!(catalog.infer_classification("porre"), Some("ere-verb"));
        assert_eq!(catalog.infer_classification("dormire"), Some("ire-verb"));
        assert_eq!(catalog.infer_classification("casa"), None);
    }

    #[test]
    fn test_requirement_matches() {
        let catalog = RuleCatalog::default();
        let tags = vec!["indicativo".to_string(), "presente".to_string()];
        assert_eq!(catalog.form.required[0].matches(&tags), vec!["indicativo"]);
        assert_eq!(catalog.form.required[1].matches(&tags), vec!["presente"]);
        assert!(catalog.form.required[1].is_exempt(&["imperativo".to_string()]));
        assert!(!catalog.form.required[0].is_exempt(&tags));
    }
}
