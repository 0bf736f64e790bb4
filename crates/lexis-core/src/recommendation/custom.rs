//! Operator-authored rule definitions.
//!
//! A custom rule names the rows it applies to and a tag transformation.
//! Definitions are persisted in sled so they can be reused across sessions.

use super::statement::{Statement, StatementBuilder};
use super::types::SafetyLevel;
use crate::error::Error;
use crate::model::{Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rows a custom rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePattern {
    /// Target table.
    pub table: Table,
    /// Target column.
    pub column: Column,
    /// Rows must carry at least one of these tags. Empty matches all rows.
    #[serde(default)]
    pub target_tags: Vec<String>,
    /// Rows must have one of these ids. Empty matches all rows.
    #[serde(default)]
    pub target_ids: Vec<String>,
}

impl RulePattern {
    /// Whether a row matches.
    pub fn matches(&self, id: &str, tags: &[String]) -> bool {
        let id_ok = self.target_ids.is_empty() || self.target_ids.iter().any(|t| t == id);
        let tags_ok = self.target_tags.is_empty() || self.target_tags.iter().any(|t| tags.contains(t));
        id_ok && tags_ok
    }
}

/// Kind of tag transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformationKind {
    /// Replace tags according to `mappings`.
    TagMapping,
    /// Add `tags_to_add`.
    AddTags,
    /// Remove `tags_to_remove`.
    RemoveTags,
}

/// Tag transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    /// Kind.
    #[serde(rename = "type")]
    pub kind: TransformationKind,
    /// Old tag to new tag.
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
    /// Tags to add.
    #[serde(default)]
    pub tags_to_add: Vec<String>,
    /// Tags to remove.
    #[serde(default)]
    pub tags_to_remove: Vec<String>,
}

/// How a custom rule is undone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackStrategy {
    /// Replay the inverse of every applied statement.
    #[default]
    Inverse,
    /// No automatic compensation.
    Manual,
}

/// A persisted custom rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRuleDefinition {
    /// Rule id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the rule does.
    #[serde(default)]
    pub description: String,
    /// Rows it applies to.
    pub pattern: RulePattern,
    /// Change it makes.
    pub transformation: Transformation,
    /// Names of existence checks to run before each change.
    #[serde(default)]
    pub safety_checks: Vec<String>,
    /// Rollback strategy.
    #[serde(default)]
    pub rollback_strategy: RollbackStrategy,
}

impl CustomRuleDefinition {
    /// Rule id used on generated recommendations.
    pub fn rule_id(&self) -> String {
        format!("custom:{}", self.id)
    }

    /// Safety of the generated recommendations.
    pub fn safety(&self) -> SafetyLevel {
        match self.rollback_strategy {
            RollbackStrategy::Inverse => SafetyLevel::Safe,
            RollbackStrategy::Manual => SafetyLevel::Caution,
        }
    }

    /// Check that the rule targets a tag column.
    pub fn check(&self) -> Result<(), Error> {
        match (self.pattern.table, self.pattern.column) {
            (Table::Words, Column::Tags) | (Table::WordForms, Column::Tags) => Ok(()),
            (table, column) => Err(Error::InvalidData(format!(
                "custom rule '{}' targets {}.{}; only tag columns of words and word_forms are supported",
                self.id, table, column
            ))),
        }
    }

    /// Statements that transform one row, skipping changes that would be
    /// no-ops.
    pub fn statements_for(&self, id: &str, tags: &[String]) -> Vec<Statement> {
        let table = self.pattern.table;
        let column = self.pattern.column;
        let t = &self.transformation;
        match t.kind {
            TransformationKind::TagMapping => {
                let mut claimed: Vec<&str> = Vec::new();
                let mut statements = Vec::new();
                for (from, to) in t.mappings.iter().filter(|(from, to)| tags.contains(from) && from != to) {
                    // A target the row already carries, or one mapped to twice, keeps only one source.
                    if tags.contains(to) || claimed.contains(&to.as_str()) {
                        statements.push(StatementBuilder::array_remove(table, column, id, from));
                    } else {
                        claimed.push(to.as_str());
                        statements.push(StatementBuilder::array_replace(table, column, id, from, to));
                    }
                }
                statements
            }
            TransformationKind::AddTags => t
                .tags_to_add
                .iter()
                .filter(|tag| !tags.contains(tag))
                .map(|tag| StatementBuilder::array_append(table, column, id, tag))
                .collect(),
            TransformationKind::RemoveTags => t
                .tags_to_remove
                .iter()
                .filter(|tag| tags.contains(tag))
                .map(|tag| StatementBuilder::array_remove(table, column, id, tag))
                .collect(),
        }
    }
}

/// Custom rule persistence.
pub struct CustomRuleStore {
    tree: sled::Tree,
}

impl CustomRuleStore {
    /// Tree name for custom rules.
    pub const TREE_NAME: &'static str = "rules:custom";

    /// Open or create the custom rule store.
    pub fn open(db: &sled::Db) -> Result<Self, Error> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { tree })
    }

    /// Save a definition, replacing any previous one with the same id.
    pub fn save(&self, rule: &CustomRuleDefinition) -> Result<(), Error> {
        rule.check()?;
        let value = serde_json::to_vec(rule).map_err(|e| Error::Serialization(e.to_string()))?;
        self.tree.insert(rule.id.as_bytes(), value)?;
        Ok(())
    }

    /// Load a definition.
    pub fn load(&self, id: &str) -> Result<Option<CustomRuleDefinition>, Error> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a definition.
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        Ok(self.tree.remove(id.as_bytes())?.is_some())
    }

    /// List all definitions, by id.
    pub fn list(&self) -> Result<Vec<CustomRuleDefinition>, Error> {
        let mut rules = Vec::new();
        for result in self.tree.iter() {
            let (_, value) = result?;
            rules.push(Self::decode(&value)?);
        }
        Ok(rules)
    }

    /// Flush to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.tree.flush()?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<CustomRuleDefinition, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}
