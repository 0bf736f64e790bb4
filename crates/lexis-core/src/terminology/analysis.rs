//! System-wide terminology usage analysis.
//!
//! Counts legacy and canonical terms across every tag set in the dataset and
//! reports concepts where both vocabularies are in use at once.

use super::mapping::{self, TermCategory, MAPPINGS};
use serde::Serialize;
use std::collections::BTreeMap;

/// Priority for migrating a mixed-usage concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationPriority {
    /// Migrate first.
    High,
    /// Migrate soon.
    Medium,
    /// Migrate when convenient.
    Low,
}

impl std::fmt::Display for MigrationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationPriority::High => write!(f, "high"),
            MigrationPriority::Medium => write!(f, "medium"),
            MigrationPriority::Low => write!(f, "low"),
        }
    }
}

/// Analysis thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Minimum count of each vocabulary for a concept to count as mixed.
    pub mixed_threshold: usize,
    /// Legacy occurrences at or above which priority is high.
    pub high_volume: usize,
    /// Legacy occurrences at or above which priority is medium.
    pub medium_volume: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mixed_threshold: 1,
            high_volume: 50,
            medium_volume: 10,
        }
    }
}

/// Usage count of a single term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermUsage {
    /// The term.
    pub term: String,
    /// Occurrences across all tag sets.
    pub count: usize,
}

/// A concept expressed in both vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixedUsage {
    /// Canonical term.
    pub canonical: String,
    /// Legacy terms for the same concept that are in use.
    pub legacy_terms: Vec<String>,
    /// Total legacy occurrences.
    pub legacy_count: usize,
    /// Canonical occurrences.
    pub canonical_count: usize,
    /// Migration priority.
    pub priority: MigrationPriority,
}

/// Usage within one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    /// The category.
    pub category: TermCategory,
    /// Legacy terms still in use.
    pub legacy_in_use: Vec<TermUsage>,
    /// Canonical terms in use.
    pub canonical_in_use: Vec<TermUsage>,
    /// Concepts with mixed usage.
    pub mixed_usage: Vec<MixedUsage>,
}

/// Result of a system-wide analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminologyAnalysis {
    /// Per-category usage.
    pub categories: Vec<CategoryUsage>,
    /// Number of tag sets analyzed.
    pub tag_sets_analyzed: usize,
    /// Total legacy occurrences.
    pub total_legacy: usize,
    /// Total canonical occurrences.
    pub total_canonical: usize,
}

impl TerminologyAnalysis {
    /// Analyze tag sets.
    pub fn from_tag_sets<'a, I>(tag_sets: I, config: &AnalysisConfig) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut frequencies: BTreeMap<String, usize> = BTreeMap::new();
        let mut sets = 0;
        for set in tag_sets {
            sets += 1;
            for tag in set {
                *frequencies.entry(tag.clone()).or_default() += 1;
            }
        }
        let mut analysis = Self::from_frequencies(&frequencies, config);
        analysis.tag_sets_analyzed = sets;
        analysis
    }

    /// Analyze a precomputed tag frequency table.
    pub fn from_frequencies(frequencies: &BTreeMap<String, usize>, config: &AnalysisConfig) -> Self {
        let mut categories = Vec::new();
        let mut total_legacy = 0;
        let mut total_canonical = 0;

        for category in TermCategory::ALL {
            let legacy_in_use: Vec<TermUsage> = MAPPINGS
                .iter()
                .filter(|m| m.category == category && count(frequencies, m.legacy) > 0)
                .map(|m| TermUsage {
                    term: m.legacy.to_string(),
                    count: count(frequencies, m.legacy),
                })
                .collect();

            let canonical = mapping::canonical_terms(category);
            let canonical_in_use: Vec<TermUsage> = canonical
                .iter()
                .filter(|t| count(frequencies, t) > 0)
                .map(|t| TermUsage {
                    term: t.to_string(),
                    count: count(frequencies, t),
                })
                .collect();

            let mut mixed_usage = Vec::new();
            for target in &canonical {
                let legacy_terms: Vec<&str> = mapping::legacy_sources(target)
                    .into_iter()
                    .filter(|l| count(frequencies, l) > 0)
                    .collect();
                let legacy_count: usize = legacy_terms.iter().map(|l| count(frequencies, l)).sum();
                let canonical_count = count(frequencies, target);

                if legacy_count >= config.mixed_threshold.max(1)
                    && canonical_count >= config.mixed_threshold.max(1)
                {
                    mixed_usage.push(MixedUsage {
                        canonical: target.to_string(),
                        legacy_terms: legacy_terms.iter().map(|l| l.to_string()).collect(),
                        legacy_count,
                        canonical_count,
                        priority: priority_for(category, legacy_count, config),
                    });
                }
            }

            total_legacy += legacy_in_use.iter().map(|u| u.count).sum::<usize>();
            total_canonical += canonical_in_use.iter().map(|u| u.count).sum::<usize>();

            categories.push(CategoryUsage {
                category,
                legacy_in_use,
                canonical_in_use,
                mixed_usage,
            });
        }

        Self {
            categories,
            tag_sets_analyzed: 0,
            total_legacy,
            total_canonical,
        }
    }

    /// Usage for one category.
    pub fn category(&self, category: TermCategory) -> Option<&CategoryUsage> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// All mixed-usage entries, highest priority first.
    pub fn mixed_usage(&self) -> Vec<&MixedUsage> {
        let mut all: Vec<&MixedUsage> = self
            .categories
            .iter()
            .flat_map(|c| c.mixed_usage.iter())
            .collect();
        all.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.legacy_count.cmp(&a.legacy_count))
        });
        all
    }

    /// Whether no legacy term remains anywhere.
    pub fn is_fully_canonical(&self) -> bool {
        self.total_legacy == 0
    }
}

fn count(frequencies: &BTreeMap<String, usize>, term: &str) -> usize {
    frequencies.get(term).copied().unwrap_or(0)
}

/// Auxiliary terms reach high priority at medium volume; person terms never
/// drop below medium.
fn priority_for(category: TermCategory, legacy_count: usize, config: &AnalysisConfig) -> MigrationPriority {
    if legacy_count >= config.high_volume
        || (category == TermCategory::Auxiliary && legacy_count >= config.medium_volume)
    {
        MigrationPriority::High
    } else if legacy_count >= config.medium_volume || category == TermCategory::Person {
        MigrationPriority::Medium
    } else {
        MigrationPriority::Low
    }
}
