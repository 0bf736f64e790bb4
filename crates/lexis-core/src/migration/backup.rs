//! Row-count baseline taken before execution.
//!
//! This is a sanity baseline for rollback, not a copy of the data: the
//! executor only issues in-place updates, so row counts must not move.

use crate::error::StoreError;
use crate::model::Table;
use crate::recommendation::MigrationPlan;
use crate::store::{current_timestamp, EntityReader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row counts for the tables a plan touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    /// When the baseline was taken (microseconds since epoch).
    pub taken_at: u64,
    /// Digest of the plan it was taken for.
    pub plan_digest: String,
    /// Rows per affected table.
    pub row_counts: BTreeMap<Table, u64>,
    /// blake3 digest of the plan digest and row counts.
    pub digest: String,
}

impl BackupInfo {
    /// Capture row counts for every table a plan statement targets.
    pub fn capture<R>(reader: &R, plan: &MigrationPlan) -> Result<Self, StoreError>
    where
        R: EntityReader + ?Sized,
    {
        let mut row_counts = BTreeMap::new();
        for statement in plan.recommendations().flat_map(|r| r.forward.iter()) {
            if !row_counts.contains_key(&statement.table) {
                row_counts.insert(statement.table, reader.row_count(statement.table)?);
            }
        }
        let digest = Self::compute_digest(&plan.digest, &row_counts);
        Ok(Self {
            taken_at: current_timestamp(),
            plan_digest: plan.digest.clone(),
            row_counts,
            digest,
        })
    }

    fn compute_digest(plan_digest: &str, row_counts: &BTreeMap<Table, u64>) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(plan_digest.as_bytes());
        for (table, count) in row_counts {
            hasher.update(table.as_str().as_bytes());
            hasher.update(&count.to_be_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Tables whose row count no longer matches the baseline.
    pub fn drift<R>(&self, reader: &R) -> Result<Vec<String>, StoreError>
    where
        R: EntityReader + ?Sized,
    {
        let mut drifted = Vec::new();
        for (table, expected) in &self.row_counts {
            let actual = reader.row_count(*table)?;
            if actual != *expected {
                drifted.push(format!("{}: {} rows before, {} after", table, expected, actual));
            }
        }
        Ok(drifted)
    }
}
