//! Planned effects of statements that were not executed.
//!
//! A dry run records each statement it would execute in a
//! [`PlannedOverlay`]. Later checks read through [`PlannedView`], which
//! answers from the overlay first and falls back to the untouched store.

use super::memory::{apply_to_entity, apply_to_form, apply_to_translation};
use super::{EntityFilter, EntityReader};
use crate::error::StoreError;
use crate::model::{Entity, EntityBundle, Form, Table, Translation};
use crate::recommendation::Statement;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Rows as they would be after the recorded statements.
#[derive(Debug, Clone, Default)]
pub struct PlannedOverlay {
    entities: HashMap<String, Entity>,
    translations: HashMap<String, Translation>,
    forms: HashMap<String, Form>,
}

impl PlannedOverlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no row has been touched.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.translations.is_empty() && self.forms.is_empty()
    }

    /// Record a statement against the rows of `base`, returning the rows it
    /// would affect.
    pub fn record<R>(&mut self, base: &R, statement: &Statement) -> Result<u64, StoreError>
    where
        R: EntityReader + ?Sized,
    {
        let id = statement.target_id.as_str();
        let not_found = || StoreError::NotFound {
            table: statement.table.to_string(),
            id: id.to_string(),
        };
        match statement.table {
            Table::Words => {
                let entity = match self.entities.entry(id.to_string()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(base.entity(id)?.ok_or_else(not_found)?),
                };
                apply_to_entity(entity, statement)
            }
            Table::WordForms => {
                let form = match self.forms.entry(id.to_string()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(base.form(id)?.ok_or_else(not_found)?),
                };
                apply_to_form(form, statement)
            }
            Table::WordTranslations => {
                let translation = match self.translations.entry(id.to_string()) {
                    Entry::Occupied(slot) => slot.into_mut(),
                    Entry::Vacant(slot) => slot.insert(base.translation(id)?.ok_or_else(not_found)?),
                };
                apply_to_translation(translation, statement)
            }
            table => Err(StoreError::Unsupported(format!("{}.{}", table, statement.column))),
        }
    }

    /// Read `base` through the overlay.
    pub fn view<'a, R>(&'a self, base: &'a R) -> PlannedView<'a, R>
    where
        R: EntityReader + ?Sized,
    {
        PlannedView { overlay: self, base }
    }
}

/// A reader that sees recorded statements as applied.
pub struct PlannedView<'a, R: ?Sized> {
    overlay: &'a PlannedOverlay,
    base: &'a R,
}

impl<R> EntityReader for PlannedView<'_, R>
where
    R: EntityReader + ?Sized,
{
    fn entities(&self, filter: &EntityFilter) -> Result<Vec<Entity>, StoreError> {
        let unfiltered = EntityFilter {
            ids: filter.ids.clone(),
            ..EntityFilter::default()
        };
        Ok(self
            .base
            .entities(&unfiltered)?
            .into_iter()
            .map(|e| self.overlay.entities.get(&e.id).cloned().unwrap_or(e))
            .filter(|e| filter.matches(e))
            .collect())
    }

    fn bundle(&self, entity_id: &str) -> Result<EntityBundle, StoreError> {
        let mut bundle = self.base.bundle(entity_id)?;
        if let Some(entity) = self.overlay.entities.get(entity_id) {
            bundle.entity = entity.clone();
        }
        for translation in bundle.translations.iter_mut() {
            if let Some(planned) = self.overlay.translations.get(&translation.id) {
                *translation = planned.clone();
            }
        }
        for form in bundle.forms.iter_mut() {
            if let Some(planned) = self.overlay.forms.get(&form.id) {
                *form = planned.clone();
            }
        }
        Ok(bundle)
    }

    fn entity(&self, id: &str) -> Result<Option<Entity>, StoreError> {
        match self.overlay.entities.get(id) {
            Some(entity) => Ok(Some(entity.clone())),
            None => self.base.entity(id),
        }
    }

    fn translation(&self, id: &str) -> Result<Option<Translation>, StoreError> {
        match self.overlay.translations.get(id) {
            Some(translation) => Ok(Some(translation.clone())),
            None => self.base.translation(id),
        }
    }

    fn form(&self, id: &str) -> Result<Option<Form>, StoreError> {
        match self.overlay.forms.get(id) {
            Some(form) => Ok(Some(form.clone())),
            None => self.base.form(id),
        }
    }

    fn row_count(&self, table: Table) -> Result<u64, StoreError> {
        self.base.row_count(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ContextMetadata, Dataset};
    use crate::recommendation::StatementBuilder;
    use crate::store::{MemoryStore, MutationStore};

    fn store() -> MemoryStore {
        let bundle = EntityBundle::new(Entity::new("w1", "andare", "verb").with_tag("are-verb"))
            .with_translation(
                Translation::new("t1", "w1", "to go").with_context(ContextMetadata::new().with_auxiliary("avere")),
            )
            .with_form(Form::new("f1", "w1", "sono andato").with_tags(["participio", "avere-aux"]));
        MemoryStore::new(Dataset::new().with_bundle(bundle))
    }

    #[test]
    fn test_recorded_statements_are_visible() {
        let store = store();
        let mut overlay = PlannedOverlay::new();
        let replace =
            StatementBuilder::array_replace(Table::WordForms, Column::Tags, "f1", "avere-aux", "avere-auxiliary");
        assert_eq!(overlay.record(&store, &replace).unwrap(), 1);
        overlay
            .record(&store, &StatementBuilder::metadata_merge("t1", "auxiliary", "essere"))
            .unwrap();

        let view = overlay.view(&store);
        assert!(view.form("f1").unwrap().unwrap().has_tag("avere-auxiliary"));
        assert_eq!(
            view.translation("t1").unwrap().unwrap().context.get("auxiliary").as_deref(),
            Some("essere")
        );
        let bundle = view.bundle("w1").unwrap();
        assert!(bundle.forms[0].has_tag("avere-auxiliary"));

        // The store itself is untouched.
        assert!(store.form("f1").unwrap().unwrap().has_tag("avere-aux"));
        assert_eq!(store.mutation_calls(), 0);
    }

    #[test]
    fn test_statements_compose() {
        let store = store();
        let mut overlay = PlannedOverlay::new();
        let append = StatementBuilder::array_append(Table::Words, Column::Tags, "w1", "intransitive-verb");
        assert_eq!(overlay.record(&store, &append).unwrap(), 1);
        assert_eq!(overlay.record(&store, &append).unwrap(), 0);

        let view = overlay.view(&store);
        let matching = view
            .entities(&EntityFilter::all().with_tag("intransitive-verb"))
            .unwrap();
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn test_missing_row_is_not_found() {
        let mut store = store();
        let mut overlay = PlannedOverlay::new();
        let stmt = StatementBuilder::array_append(Table::WordForms, Column::Tags, "f404", "x");
        assert!(matches!(overlay.record(&store, &stmt), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.execute(&stmt), Err(StoreError::NotFound { .. })));
        assert!(overlay.is_empty());
    }
}
