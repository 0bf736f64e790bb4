//! Migration plan assembly.

use super::batch::MigrationBatch;
use super::types::{MigrationRecommendation, RecommendationCategory, SafetyLevel};
use crate::compliance::Severity;
use crate::migration::SystemCheck;
use crate::store::current_timestamp;
use serde::{Deserialize, Serialize};

/// Generate a unique plan id.
pub fn generate_plan_id() -> String {
    let ts = current_timestamp();
    let mut id = [0u8; 16];
    id[0..8].copy_from_slice(&ts.to_be_bytes());
    let hash = ts.wrapping_mul(0x517cc1b727220a95);
    id[8..16].copy_from_slice(&hash.to_be_bytes());
    hex::encode(id)
}

/// Overall plan risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Few critical or manual items.
    Low,
    /// Some critical or manual items.
    Medium,
    /// Many critical or manual items.
    High,
}

impl RiskLevel {
    /// Assess risk from the critical and manual-review recommendation counts.
    pub fn assess(critical: usize, manual_review: usize) -> Self {
        if critical > 5 || manual_review > 3 {
            RiskLevel::High
        } else if critical > 2 || manual_review > 1 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Recommendation counts for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    /// All recommendations.
    pub total: usize,
    /// Safe recommendations.
    pub safe: usize,
    /// Caution recommendations.
    pub caution: usize,
    /// Manual-review recommendations.
    pub manual_review: usize,
    /// Recommendations derived from critical issues.
    pub critical: usize,
}

impl PlanCounts {
    fn tally<'a>(recs: impl Iterator<Item = &'a MigrationRecommendation>) -> Self {
        let mut counts = Self::default();
        for rec in recs {
            counts.total += 1;
            match rec.safety {
                SafetyLevel::Safe => counts.safe += 1,
                SafetyLevel::Caution => counts.caution += 1,
                SafetyLevel::ManualReview => counts.manual_review += 1,
            }
            if rec.severity == Severity::Critical {
                counts.critical += 1;
            }
        }
        counts
    }
}

/// The full ordered set of batches for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Plan id.
    pub id: String,
    /// When the plan was created (microseconds since epoch).
    pub created_at: u64,
    /// Batches in declared order.
    pub batches: Vec<MigrationBatch>,
    /// Recommendation counts.
    pub counts: PlanCounts,
    /// Risk assessment.
    pub risk: RiskLevel,
    /// Sum of recommendation estimates, in seconds.
    pub estimated_total_secs: u64,
    /// Checks that must pass before any mutation.
    pub pre_checks: Vec<SystemCheck>,
    /// Checks run after execution; failures are warnings.
    pub success_criteria: Vec<SystemCheck>,
    /// blake3 digest of every statement in the plan.
    pub digest: String,
}

impl MigrationPlan {
    /// Assemble a plan from batches.
    pub fn new(batches: Vec<MigrationBatch>) -> Self {
        let counts = PlanCounts::tally(batches.iter().flat_map(|b| b.recommendations.iter()));
        let estimated_total_secs = batches.iter().map(|b| b.estimated_secs).sum();
        let digest = Self::compute_digest(&batches);

        let has_batch = |category: RecommendationCategory| batches.iter().any(|b| b.category == category);
        let mut success_criteria = Vec::new();
        if has_batch(RecommendationCategory::Terminology) {
            success_criteria.push(SystemCheck::NoLegacyTerminology);
        }
        if has_batch(RecommendationCategory::AuxiliaryAssignment) {
            success_criteria.push(SystemCheck::AuxiliariesAssigned);
        }
        if has_batch(RecommendationCategory::CrossReference) {
            success_criteria.push(SystemCheck::FormReferencesResolve);
        }

        Self {
            id: generate_plan_id(),
            created_at: current_timestamp(),
            risk: RiskLevel::assess(counts.critical, counts.manual_review),
            counts,
            estimated_total_secs,
            pre_checks: vec![SystemCheck::StoreReachable, SystemCheck::TargetsExist],
            success_criteria,
            digest,
            batches,
        }
    }

    /// Digest over every forward and rollback statement, in plan order.
    pub fn compute_digest(batches: &[MigrationBatch]) -> String {
        let mut hasher = blake3::Hasher::new();
        for rec in batches.iter().flat_map(|b| b.recommendations.iter()) {
            hasher.update(rec.id.as_bytes());
            for statement in rec.forward.iter().chain(rec.rollback.iter()) {
                hasher.update(b"\n");
                hasher.update(statement.sql.as_bytes());
            }
            hasher.update(b"\n\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Whether the batches still match the digest.
    pub fn verify_digest(&self) -> bool {
        Self::compute_digest(&self.batches) == self.digest
    }

    /// All recommendations, in batch order.
    pub fn recommendations(&self) -> impl Iterator<Item = &MigrationRecommendation> {
        self.batches.iter().flat_map(|b| b.recommendations.iter())
    }

    /// Look up a batch.
    pub fn batch(&self, id: &str) -> Option<&MigrationBatch> {
        self.batches.iter().find(|b| b.id == id)
    }

    /// Look up a recommendation.
    pub fn recommendation(&self, id: &str) -> Option<&MigrationRecommendation> {
        self.recommendations().find(|r| r.id == id)
    }

    /// Whether the plan has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
