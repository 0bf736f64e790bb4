//! Mutation statements.
//!
//! Every statement the engine produces is built here. A statement carries a
//! typed operation, which stores interpret, and the SQL text rendered from
//! it, which operators review. Identifiers only ever come from [`Table`] and
//! [`Column`]; literals are quoted and escaped.

use crate::model::{Column, Table};
use serde::{Deserialize, Serialize};

/// Typed mutation operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum StatementOp {
    /// Append a value to an array column if it is not already present.
    ArrayAppend {
        /// Value to append.
        value: String,
    },
    /// Remove a value from an array column.
    ArrayRemove {
        /// Value to remove.
        value: String,
    },
    /// Replace every occurrence of one array element with another. Skipped
    /// when the replacement is already present, so two values are never
    /// folded into one.
    ArrayReplace {
        /// Current value.
        from: String,
        /// Replacement.
        to: String,
    },
    /// Merge a key into a JSON object column.
    MetadataMerge {
        /// Key.
        key: String,
        /// Value.
        value: String,
    },
    /// Remove a key from a JSON object column.
    MetadataRemove {
        /// Key.
        key: String,
    },
}

impl StatementOp {
    /// Operation name.
    pub fn name(&self) -> &'static str {
        match self {
            StatementOp::ArrayAppend { .. } => "array_append",
            StatementOp::ArrayRemove { .. } => "array_remove",
            StatementOp::ArrayReplace { .. } => "array_replace",
            StatementOp::MetadataMerge { .. } => "metadata_merge",
            StatementOp::MetadataRemove { .. } => "metadata_remove",
        }
    }
}

/// A single, self-contained mutation against one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    /// Operation.
    pub op: StatementOp,
    /// Target table.
    pub table: Table,
    /// Target column.
    pub column: Column,
    /// Target row id.
    pub target_id: String,
    /// Rendered SQL.
    pub sql: String,
}

impl Statement {
    /// The compensating statement, when it can be derived from this one alone.
    ///
    /// Metadata merges need the previous value and return `None`; handlers
    /// build their rollback explicitly.
    pub fn inverse(&self) -> Option<Statement> {
        let op = match &self.op {
            StatementOp::ArrayAppend { value } => StatementOp::ArrayRemove {
                value: value.clone(),
            },
            StatementOp::ArrayRemove { value } => StatementOp::ArrayAppend {
                value: value.clone(),
            },
            StatementOp::ArrayReplace { from, to } => StatementOp::ArrayReplace {
                from: to.clone(),
                to: from.clone(),
            },
            StatementOp::MetadataMerge { .. } | StatementOp::MetadataRemove { .. } => return None,
        };
        Some(StatementBuilder::build(op, self.table, self.column, &self.target_id))
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Quote a string literal for SQL.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Builds [`Statement`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementBuilder;

impl StatementBuilder {
    /// `array_append`, guarded so replaying it is a no-op.
    pub fn array_append(
        table: Table,
        column: Column,
        target_id: &str,
        value: impl Into<String>,
    ) -> Statement {
        Self::build(
            StatementOp::ArrayAppend {
                value: value.into(),
            },
            table,
            column,
            target_id,
        )
    }

    /// `array_remove`.
    pub fn array_remove(
        table: Table,
        column: Column,
        target_id: &str,
        value: impl Into<String>,
    ) -> Statement {
        Self::build(
            StatementOp::ArrayRemove {
                value: value.into(),
            },
            table,
            column,
            target_id,
        )
    }

    /// `array_replace`, guarded on the replacement being absent.
    pub fn array_replace(
        table: Table,
        column: Column,
        target_id: &str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Statement {
        Self::build(
            StatementOp::ArrayReplace {
                from: from.into(),
                to: to.into(),
            },
            table,
            column,
            target_id,
        )
    }

    /// Merge one key into the translation context map.
    pub fn metadata_merge(target_id: &str, key: impl Into<String>, value: impl Into<String>) -> Statement {
        Self::build(
            StatementOp::MetadataMerge {
                key: key.into(),
                value: value.into(),
            },
            Table::WordTranslations,
            Column::ContextMetadata,
            target_id,
        )
    }

    /// Remove one key from the translation context map.
    pub fn metadata_remove(target_id: &str, key: impl Into<String>) -> Statement {
        Self::build(
            StatementOp::MetadataRemove { key: key.into() },
            Table::WordTranslations,
            Column::ContextMetadata,
            target_id,
        )
    }

    fn build(op: StatementOp, table: Table, column: Column, target_id: &str) -> Statement {
        let sql = render(&op, table, column, target_id);
        Statement {
            op,
            table,
            column,
            target_id: target_id.to_string(),
            sql,
        }
    }
}

fn render(op: &StatementOp, table: Table, column: Column, target_id: &str) -> String {
    let id = quote(target_id);
    match op {
        StatementOp::ArrayAppend { value } => {
            let v = quote(value);
            format!(
                "UPDATE {table} SET {column} = array_append(COALESCE({column}, '{{}}'), {v}) \
                 WHERE id = {id} AND NOT ({v} = ANY(COALESCE({column}, '{{}}')))"
            )
        }
        StatementOp::ArrayRemove { value } => {
            let v = quote(value);
            format!(
                "UPDATE {table} SET {column} = array_remove({column}, {v}) \
                 WHERE id = {id} AND {v} = ANY({column})"
            )
        }
        StatementOp::ArrayReplace { from, to } => {
            let f = quote(from);
            let t = quote(to);
            format!(
                "UPDATE {table} SET {column} = array_replace({column}, {f}, {t}) \
                 WHERE id = {id} AND {f} = ANY({column}) AND NOT ({t} = ANY({column}))"
            )
        }
        StatementOp::MetadataMerge { key, value } => {
            let mut object = serde_json::Map::new();
            object.insert(key.clone(), serde_json::Value::String(value.clone()));
            let object = serde_json::Value::Object(object).to_string();
            format!(
                "UPDATE {table} SET {column} = COALESCE({column}, '{{}}'::jsonb) || {}::jsonb \
                 WHERE id = {id}",
                quote(&object)
            )
        }
        StatementOp::MetadataRemove { key } => {
            format!("UPDATE {table} SET {column} = {column} - {} WHERE id = {id}", quote(key))
        }
    }
}
