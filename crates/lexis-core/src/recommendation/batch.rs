//! Batches of recommendations.

use super::types::{MigrationRecommendation, RecommendationCategory, SafetyLevel};
use serde::{Deserialize, Serialize};

/// An ordered, dependency-aware group of recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationBatch {
    /// Batch id (the category name).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category of every recommendation in the batch.
    pub category: RecommendationCategory,
    /// Recommendations, by priority.
    pub recommendations: Vec<MigrationRecommendation>,
    /// Ids of batches that must complete first.
    pub dependencies: Vec<String>,
    /// Sum of the recommendation estimates, in seconds.
    pub estimated_secs: u64,
}

impl MigrationBatch {
    /// Number of recommendations.
    pub fn len(&self) -> usize {
        self.recommendations.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/// Batch a recommendation lands in. Manual-review recommendations always go
/// to the manual-review batch, whatever their category. Caution
/// recommendations stay in their category's batch and carry their own
/// per-item checks.
fn batch_category(rec: &MigrationRecommendation) -> RecommendationCategory {
    if rec.safety == SafetyLevel::ManualReview {
        RecommendationCategory::ManualReview
    } else {
        rec.category
    }
}

/// Partition recommendations into the fixed batch sequence.
///
/// Empty batches are omitted, and declared dependencies only name batches
/// that exist.
pub fn create_batches(recommendations: Vec<MigrationRecommendation>) -> Vec<MigrationBatch> {
    let mut grouped: Vec<(RecommendationCategory, Vec<MigrationRecommendation>)> = RecommendationCategory::ORDER
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();
    for rec in recommendations {
        let category = batch_category(&rec);
        if let Some((_, recs)) = grouped.iter_mut().find(|(c, _)| *c == category) {
            recs.push(rec);
        }
    }

    let present: Vec<RecommendationCategory> = grouped
        .iter()
        .filter(|(_, recs)| !recs.is_empty())
        .map(|(c, _)| *c)
        .collect();

    grouped
        .into_iter()
        .filter(|(_, recs)| !recs.is_empty())
        .map(|(category, mut recs)| {
            recs.sort_by_key(|r| r.priority);
            let dependencies = category
                .dependencies()
                .iter()
                .filter(|d| present.contains(d))
                .map(|d| d.as_str().to_string())
                .collect();
            MigrationBatch {
                id: category.as_str().to_string(),
                name: category.display_name().to_string(),
                category,
                estimated_secs: recs.iter().map(|r| r.estimated_secs).sum(),
                recommendations: recs,
                dependencies,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{IssueTarget, Severity};

    fn rec(category: RecommendationCategory, safety: SafetyLevel, severity: Severity, id: &str) -> MigrationRecommendation {
        let mut rec = MigrationRecommendation::new(
            "rule",
            severity,
            "w1",
            IssueTarget::Entity("w1".into()),
            category,
            safety,
            "desc",
        );
        rec.id = id.to_string();
        rec
    }

    #[test]
    fn test_batches_follow_fixed_sequence() {
        let batches = create_batches(vec![
            rec(RecommendationCategory::CrossReference, SafetyLevel::Caution, Severity::High, "a"),
            rec(RecommendationCategory::Terminology, SafetyLevel::Safe, Severity::Critical, "b"),
            rec(RecommendationCategory::TagStandardization, SafetyLevel::ManualReview, Severity::Low, "c"),
        ]);
        let ids: Vec<&str> = batches.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["terminology", "cross-reference", "manual-review"]);
        assert_eq!(batches[1].dependencies, vec!["terminology".to_string()]);
        assert!(batches[2].dependencies.is_empty());
        assert_eq!(batches[2].estimated_secs, 0);
    }

    #[test]
    fn test_batch_sorted_by_priority_stably() {
        let batches = create_batches(vec![
            rec(RecommendationCategory::TagStandardization, SafetyLevel::Safe, Severity::Medium, "m1"),
            rec(RecommendationCategory::TagStandardization, SafetyLevel::Safe, Severity::Critical, "c1"),
            rec(RecommendationCategory::TagStandardization, SafetyLevel::Safe, Severity::Medium, "m2"),
        ]);
        assert_eq!(batches.len(), 1);
        let ids: Vec<&str> = batches[0].recommendations.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "m1", "m2"]);
        assert_eq!(batches[0].estimated_secs, 6);
    }

    #[test]
    fn test_caution_tag_fix_keeps_its_checks() {
        let batches = create_batches(vec![
            rec(RecommendationCategory::TagStandardization, SafetyLevel::Safe, Severity::Medium, "safe"),
            rec(RecommendationCategory::TagStandardization, SafetyLevel::Caution, Severity::Critical, "inferred"),
        ]);
        let ids: Vec<&str> = batches.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["tag-standardization"]);

        let recs = &batches[0].recommendations;
        assert_eq!(recs[0].id, "inferred");
        assert!(recs[0].validation_required);
        assert!(!recs[1].validation_required);
    }

    #[test]
    fn test_no_recommendations_no_batches() {
        assert!(create_batches(Vec::new()).is_empty());
    }
}
