//! Static legacy/canonical term table.
//!
//! Entries are listed in registration order. When several legacy terms share
//! a canonical target, the reverse lookup returns the first one registered.

use serde::{Deserialize, Serialize};

/// Grammatical category a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermCategory {
    /// Grammatical person.
    Person,
    /// Grammatical number.
    Number,
    /// Auxiliary role.
    Auxiliary,
    /// Verbal mood.
    Mood,
}

impl TermCategory {
    /// All categories.
    pub const ALL: [TermCategory; 4] = [
        TermCategory::Person,
        TermCategory::Number,
        TermCategory::Auxiliary,
        TermCategory::Mood,
    ];
}

impl std::fmt::Display for TermCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermCategory::Person => write!(f, "person"),
            TermCategory::Number => write!(f, "number"),
            TermCategory::Auxiliary => write!(f, "auxiliary"),
            TermCategory::Mood => write!(f, "mood"),
        }
    }
}

/// One legacy-to-canonical mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermMapping {
    /// Category of both terms.
    pub category: TermCategory,
    /// Legacy term.
    pub legacy: &'static str,
    /// Canonical term.
    pub canonical: &'static str,
}

const fn mapping(
    category: TermCategory,
    legacy: &'static str,
    canonical: &'static str,
) -> TermMapping {
    TermMapping {
        category,
        legacy,
        canonical,
    }
}

/// The mapping table.
pub static MAPPINGS: &[TermMapping] = &[
    mapping(TermCategory::Person, "io", "prima-persona"),
    mapping(TermCategory::Person, "tu", "seconda-persona"),
    mapping(TermCategory::Person, "lui", "terza-persona"),
    mapping(TermCategory::Person, "lei", "terza-persona"),
    mapping(TermCategory::Number, "singular", "singolare"),
    mapping(TermCategory::Number, "plural", "plurale"),
    mapping(TermCategory::Auxiliary, "avere-aux", "avere-auxiliary"),
    mapping(TermCategory::Auxiliary, "essere-aux", "essere-auxiliary"),
    mapping(TermCategory::Mood, "indicative", "indicativo"),
    mapping(TermCategory::Mood, "subjunctive", "congiuntivo"),
    mapping(TermCategory::Mood, "conditional", "condizionale"),
    mapping(TermCategory::Mood, "imperative", "imperativo"),
];

/// Find the mapping for a legacy term.
pub fn by_legacy(term: &str) -> Option<&'static TermMapping> {
    MAPPINGS.iter().find(|m| m.legacy == term)
}

/// Find the first-registered mapping for a canonical term.
pub fn by_canonical(term: &str) -> Option<&'static TermMapping> {
    MAPPINGS.iter().find(|m| m.canonical == term)
}

/// All legacy terms that map to a canonical term, in registration order.
pub fn legacy_sources(canonical: &str) -> Vec<&'static str> {
    MAPPINGS
        .iter()
        .filter(|m| m.canonical == canonical)
        .map(|m| m.legacy)
        .collect()
}

/// Canonical terms of a category, deduplicated, in registration order.
pub fn canonical_terms(category: TermCategory) -> Vec<&'static str> {
    let mut terms: Vec<&'static str> = Vec::new();
    for m in MAPPINGS.iter().filter(|m| m.category == category) {
        if !terms.contains(&m.canonical) {
            terms.push(m.canonical);
        }
    }
    terms
}
