//! Store interfaces.
//!
//! The subsystem reads entities through [`EntityReader`] and mutates them
//! only by submitting pre-built statements to [`MutationStore`]. It owns no
//! locking; each statement is assumed atomic on its own.

mod memory;
mod overlay;

pub use memory::MemoryStore;
pub use overlay::{PlannedOverlay, PlannedView};

use crate::error::StoreError;
use crate::model::{Entity, EntityBundle, Form, Table, Translation};
use crate::recommendation::Statement;

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_micros() as u64
}

/// Entity query filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFilter {
    /// Restrict to these ids.
    pub ids: Option<Vec<String>>,
    /// Every tag listed must be present.
    pub tags: Vec<String>,
    /// Restrict to one category.
    pub category: Option<String>,
}

impl EntityFilter {
    /// Match every entity.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given ids.
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Require a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restrict to a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether an entity passes the filter.
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| *id == entity.id) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if entity.category != *category {
                return false;
            }
        }
        self.tags.iter().all(|t| entity.has_tag(t))
    }
}

/// Read access to the tagged-entity store.
pub trait EntityReader {
    /// Entities matching a filter, in store order.
    fn entities(&self, filter: &EntityFilter) -> Result<Vec<Entity>, StoreError>;

    /// An entity with its translations, forms and links.
    fn bundle(&self, entity_id: &str) -> Result<EntityBundle, StoreError>;

    /// Look up an entity.
    fn entity(&self, id: &str) -> Result<Option<Entity>, StoreError>;

    /// Look up a translation.
    fn translation(&self, id: &str) -> Result<Option<Translation>, StoreError>;

    /// Look up a form.
    fn form(&self, id: &str) -> Result<Option<Form>, StoreError>;

    /// Number of rows in a table.
    fn row_count(&self, table: Table) -> Result<u64, StoreError>;
}

/// Statement execution.
pub trait MutationStore {
    /// Execute one statement and return the number of rows affected.
    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError>;
}

/// A store that can be both read and mutated.
pub trait EntityStore: EntityReader + MutationStore {}

impl<T: EntityReader + MutationStore> EntityStore for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matching() {
        let entity = Entity::new("w1", "parlare", "verb").with_tags(["are-verb", "transitive-verb"]);

        assert!(EntityFilter::all().matches(&entity));
        assert!(EntityFilter::all().with_tag("are-verb").matches(&entity));
        assert!(!EntityFilter::all().with_tag("ere-verb").matches(&entity));
        assert!(EntityFilter::all().with_category("verb").matches(&entity));
        assert!(!EntityFilter::all().with_category("noun").matches(&entity));
        assert!(EntityFilter::all().with_ids(["w1", "w2"]).matches(&entity));
        assert!(!EntityFilter::all().with_ids(["w2"]).matches(&entity));
    }

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000_000);
    }
}
