//! Bidirectional term conversion and tag-set consistency checks.

use super::mapping::{self, TermCategory};
use serde::Serialize;
use std::collections::BTreeMap;

/// Options for [`TerminologyConverter::convert_tag_set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Keep legacy tags next to their canonical replacements (transition mode).
    pub keep_legacy: bool,
}

impl ConversionOptions {
    /// Full-migration mode: legacy tags are replaced.
    pub fn full_migration() -> Self {
        Self { keep_legacy: false }
    }

    /// Transition mode: legacy tags are kept alongside canonical ones.
    pub fn transition() -> Self {
        Self { keep_legacy: true }
    }
}

/// A single legacy-to-canonical conversion that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermConversion {
    /// Original tag.
    pub from: String,
    /// Canonical tag.
    pub to: String,
    /// Category of the term.
    pub category: TermCategory,
}

/// A non-fatal consistency finding on a tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConsistencyWarning {
    /// More than one tag from the same category.
    MultipleInCategory {
        /// The category.
        category: TermCategory,
        /// The tags found.
        tags: Vec<String>,
    },
    /// A person tag with no number tag.
    PersonWithoutNumber,
    /// A number tag with no person tag.
    NumberWithoutPerson,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyWarning::MultipleInCategory { category, tags } => {
                write!(f, "multiple {} tags: {}", category, tags.join(", "))
            }
            ConsistencyWarning::PersonWithoutNumber => write!(f, "person tag without number tag"),
            ConsistencyWarning::NumberWithoutPerson => write!(f, "number tag without person tag"),
        }
    }
}

/// Result of converting a tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Converted tags, duplicates removed, original order kept.
    pub tags: Vec<String>,
    /// Conversions applied.
    pub conversions: Vec<TermConversion>,
    /// Consistency warnings on the converted set.
    pub warnings: Vec<ConsistencyWarning>,
}

impl ConversionResult {
    /// Whether any tag changed.
    pub fn changed(&self) -> bool {
        !self.conversions.is_empty()
    }
}

/// Maps terms between the legacy and canonical vocabularies.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminologyConverter;

impl TerminologyConverter {
    /// Create a converter.
    pub fn new() -> Self {
        Self
    }

    /// Canonical equivalent of a legacy term.
    pub fn to_canonical(&self, term: &str) -> Option<&'static str> {
        mapping::by_legacy(term).map(|m| m.canonical)
    }

    /// Legacy equivalent of a canonical term. The first-registered legacy
    /// term wins when several share the same target.
    pub fn from_canonical(&self, term: &str) -> Option<&'static str> {
        mapping::by_canonical(term).map(|m| m.legacy)
    }

    /// Whether a term is a known legacy term.
    pub fn is_legacy(&self, term: &str) -> bool {
        mapping::by_legacy(term).is_some()
    }

    /// Whether a term is a known canonical term.
    pub fn is_canonical(&self, term: &str) -> bool {
        mapping::by_canonical(term).is_some()
    }

    /// Category of a legacy or canonical term.
    pub fn category(&self, term: &str) -> Option<TermCategory> {
        mapping::by_legacy(term)
            .or_else(|| mapping::by_canonical(term))
            .map(|m| m.category)
    }

    /// Convert every legacy tag in a set.
    ///
    /// Unknown tags pass through unchanged. Warnings are informational and
    /// never prevent conversion.
    pub fn convert_tag_set(&self, tags: &[String], options: &ConversionOptions) -> ConversionResult {
        let mut out: Vec<String> = Vec::with_capacity(tags.len());
        let mut conversions = Vec::new();

        let push = |out: &mut Vec<String>, tag: &str| {
            if !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        };

        for tag in tags {
            match mapping::by_legacy(tag) {
                Some(m) => {
                    if options.keep_legacy {
                        push(&mut out, tag);
                    }
                    push(&mut out, m.canonical);
                    conversions.push(TermConversion {
                        from: tag.clone(),
                        to: m.canonical.to_string(),
                        category: m.category,
                    });
                }
                None => push(&mut out, tag),
            }
        }

        let warnings = self.check_consistency(&out);
        ConversionResult {
            tags: out,
            conversions,
            warnings,
        }
    }

    /// Semantic consistency checks on a tag set.
    pub fn check_consistency(&self, tags: &[String]) -> Vec<ConsistencyWarning> {
        let mut by_category: BTreeMap<TermCategory, Vec<String>> = BTreeMap::new();
        for tag in tags {
            if let Some(category) = self.category(tag) {
                by_category.entry(category).or_default().push(tag.clone());
            }
        }

        let mut warnings = Vec::new();
        for (category, found) in &by_category {
            if found.len() > 1 {
                warnings.push(ConsistencyWarning::MultipleInCategory {
                    category: *category,
                    tags: found.clone(),
                });
            }
        }

        let has_person = by_category.contains_key(&TermCategory::Person);
        let has_number = by_category.contains_key(&TermCategory::Number);
        if has_person && !has_number {
            warnings.push(ConsistencyWarning::PersonWithoutNumber);
        } else if has_number && !has_person {
            warnings.push(ConsistencyWarning::NumberWithoutPerson);
        }

        warnings
    }

    /// Legacy tags present in a set.
    pub fn legacy_tags<'a>(&self, tags: &'a [String]) -> Vec<&'a str> {
        tags.iter()
            .filter(|t| self.is_legacy(t))
            .map(String::as_str)
            .collect()
    }
}
