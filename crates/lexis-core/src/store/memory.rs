//! In-memory store over a [`Dataset`].

use super::{EntityFilter, EntityReader, MutationStore};
use crate::error::StoreError;
use crate::model::{Column, Dataset, Entity, EntityBundle, Form, Table, Translation};
use crate::recommendation::{Statement, StatementOp};
use std::collections::HashSet;

/// A store backed by an owned dataset.
///
/// Statements are applied by interpreting their typed operation; the SQL
/// text is recorded in an execution log. Failures can be injected per
/// target id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dataset: Dataset,
    mutation_calls: u64,
    executed: Vec<String>,
    fail_on: HashSet<String>,
    unreadable: HashSet<String>,
}

impl MemoryStore {
    /// Create a store over a dataset.
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            ..Self::default()
        }
    }

    /// Reject every statement targeting this row id.
    pub fn fail_on(mut self, target_id: impl Into<String>) -> Self {
        self.fail_on.insert(target_id.into());
        self
    }

    /// Make `bundle` fail for this entity id.
    pub fn unreadable(mut self, entity_id: impl Into<String>) -> Self {
        self.unreadable.insert(entity_id.into());
        self
    }

    /// The current dataset.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Consume the store, returning the dataset.
    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    /// Number of `execute` calls, successful or not.
    pub fn mutation_calls(&self) -> u64 {
        self.mutation_calls
    }

    /// SQL of successfully executed statements, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    fn apply(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        let not_found = || StoreError::NotFound {
            table: statement.table.to_string(),
            id: statement.target_id.clone(),
        };
        let id = statement.target_id.as_str();
        let bundles = &mut self.dataset.bundles;

        match statement.table {
            Table::Words => {
                let entity = bundles
                    .iter_mut()
                    .map(|b| &mut b.entity)
                    .find(|e| e.id == id)
                    .ok_or_else(not_found)?;
                apply_to_entity(entity, statement)
            }
            Table::WordForms => {
                let form = bundles
                    .iter_mut()
                    .flat_map(|b| b.forms.iter_mut())
                    .find(|f| f.id == id)
                    .ok_or_else(not_found)?;
                apply_to_form(form, statement)
            }
            Table::WordTranslations => {
                let translation = bundles
                    .iter_mut()
                    .flat_map(|b| b.translations.iter_mut())
                    .find(|t| t.id == id)
                    .ok_or_else(not_found)?;
                apply_to_translation(translation, statement)
            }
            table => Err(unsupported(table, statement.column)),
        }
    }
}

fn unsupported(table: Table, column: Column) -> StoreError {
    StoreError::Unsupported(format!("{}.{}", table, column))
}

/// Apply a statement to an entity row.
pub(super) fn apply_to_entity(entity: &mut Entity, statement: &Statement) -> Result<u64, StoreError> {
    match statement.column {
        Column::Tags => apply_array(&mut entity.tags, &statement.op),
        column => Err(unsupported(statement.table, column)),
    }
}

/// Apply a statement to a form row.
pub(super) fn apply_to_form(form: &mut Form, statement: &Statement) -> Result<u64, StoreError> {
    match statement.column {
        Column::Tags => apply_array(&mut form.tags, &statement.op),
        column => Err(unsupported(statement.table, column)),
    }
}

/// Apply a statement to a translation row.
pub(super) fn apply_to_translation(
    translation: &mut Translation,
    statement: &Statement,
) -> Result<u64, StoreError> {
    match (statement.column, &statement.op) {
        (Column::FormIds, op) => {
            let refs = translation.form_ids.get_or_insert_with(Vec::new);
            apply_array(refs, op)
        }
        (Column::ContextMetadata, StatementOp::MetadataMerge { key, value }) => {
            translation.context.set(key, value.clone());
            Ok(1)
        }
        (Column::ContextMetadata, StatementOp::MetadataRemove { key }) => {
            translation.context.remove(key);
            Ok(1)
        }
        (Column::ContextMetadata, other) => Err(StoreError::Unsupported(format!(
            "{} on {}",
            other.name(),
            statement.column
        ))),
        (column, _) => Err(unsupported(statement.table, column)),
    }
}

/// Apply an array operation. Guarded operations report zero rows when the
/// guard does not hold, matching the rendered SQL.
fn apply_array(values: &mut Vec<String>, op: &StatementOp) -> Result<u64, StoreError> {
    match op {
        StatementOp::ArrayAppend { value } => {
            if values.contains(value) {
                return Ok(0);
            }
            values.push(value.clone());
            Ok(1)
        }
        StatementOp::ArrayRemove { value } => {
            let before = values.len();
            values.retain(|v| v != value);
            Ok(u64::from(values.len() != before))
        }
        StatementOp::ArrayReplace { from, to } => {
            if !values.contains(from) || values.contains(to) {
                return Ok(0);
            }
            for v in values.iter_mut().filter(|v| *v == from) {
                *v = to.clone();
            }
            Ok(1)
        }
        other => Err(StoreError::Unsupported(format!("{} on array column", other.name()))),
    }
}

impl EntityReader for MemoryStore {
    fn entities(&self, filter: &EntityFilter) -> Result<Vec<Entity>, StoreError> {
        Ok(self
            .dataset
            .bundles
            .iter()
            .map(|b| &b.entity)
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn bundle(&self, entity_id: &str) -> Result<EntityBundle, StoreError> {
        if self.unreadable.contains(entity_id) {
            return Err(StoreError::Backend(format!("cannot read entity {}", entity_id)));
        }
        self.dataset
            .bundles
            .iter()
            .find(|b| b.entity.id == entity_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                table: Table::Words.to_string(),
                id: entity_id.to_string(),
            })
    }

    fn entity(&self, id: &str) -> Result<Option<Entity>, StoreError> {
        Ok(self
            .dataset
            .bundles
            .iter()
            .find(|b| b.entity.id == id)
            .map(|b| b.entity.clone()))
    }

    fn translation(&self, id: &str) -> Result<Option<Translation>, StoreError> {
        Ok(self
            .dataset
            .bundles
            .iter()
            .flat_map(|b| b.translations.iter())
            .find(|t| t.id == id)
            .cloned())
    }

    fn form(&self, id: &str) -> Result<Option<Form>, StoreError> {
        Ok(self
            .dataset
            .bundles
            .iter()
            .flat_map(|b| b.forms.iter())
            .find(|f| f.id == id)
            .cloned())
    }

    fn row_count(&self, table: Table) -> Result<u64, StoreError> {
        Ok(self.dataset.row_count(table))
    }
}

impl MutationStore for MemoryStore {
    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        self.mutation_calls += 1;
        if self.fail_on.contains(&statement.target_id) {
            return Err(StoreError::Rejected(format!(
                "injected failure for {}",
                statement.target_id
            )));
        }
        let rows = self.apply(statement)?;
        self.executed.push(statement.sql.clone());
        Ok(rows)
    }
}
