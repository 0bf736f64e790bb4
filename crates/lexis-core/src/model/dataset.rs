//! Bundles of related records and the tables that back them.

use super::entity::{Entity, Form, FormTranslationLink, Translation};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A backing table in the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Entities.
    Words,
    /// Translations.
    WordTranslations,
    /// Forms.
    WordForms,
    /// Form/translation join table.
    FormTranslations,
}

impl Table {
    /// The SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Words => "words",
            Table::WordTranslations => "word_translations",
            Table::WordForms => "word_forms",
            Table::FormTranslations => "form_translations",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutable column the engine is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Tag array on words and forms.
    Tags,
    /// JSON context map on translations.
    ContextMetadata,
    /// Form id array on translations.
    FormIds,
}

impl Column {
    /// The SQL column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Tags => "tags",
            Column::ContextMetadata => "context_metadata",
            Column::FormIds => "form_ids",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity together with everything that belongs to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBundle {
    /// The entity itself.
    pub entity: Entity,
    /// Its translations.
    #[serde(default)]
    pub translations: Vec<Translation>,
    /// Its forms.
    #[serde(default)]
    pub forms: Vec<Form>,
    /// Form/translation links.
    #[serde(default)]
    pub links: Vec<FormTranslationLink>,
}

impl EntityBundle {
    /// Create a bundle with no children.
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            translations: Vec::new(),
            forms: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add a translation.
    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translations.push(translation);
        self
    }

    /// Add a form.
    pub fn with_form(mut self, form: Form) -> Self {
        self.forms.push(form);
        self
    }

    /// Add a link.
    pub fn with_link(mut self, link: FormTranslationLink) -> Self {
        self.links.push(link);
        self
    }

    /// Find a form by id.
    pub fn form(&self, id: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.id == id)
    }

    /// Find a translation by id.
    pub fn translation(&self, id: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.id == id)
    }

    /// Form ids linked to a translation through the join table.
    pub fn linked_form_ids(&self, translation_id: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| l.translation_id == translation_id)
            .map(|l| l.form_id.as_str())
            .collect()
    }
}

/// A collection of bundles, as stored in a dataset file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// All bundles.
    pub bundles: Vec<EntityBundle>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle.
    pub fn with_bundle(mut self, bundle: EntityBundle) -> Self {
        self.bundles.push(bundle);
        self
    }

    /// Parse a dataset from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Load a dataset from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the dataset to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: Table) -> u64 {
        let count: usize = match table {
            Table::Words => self.bundles.len(),
            Table::WordTranslations => self.bundles.iter().map(|b| b.translations.len()).sum(),
            Table::WordForms => self.bundles.iter().map(|b| b.forms.len()).sum(),
            Table::FormTranslations => self.bundles.iter().map(|b| b.links.len()).sum(),
        };
        count as u64
    }
}
