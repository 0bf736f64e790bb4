//! Lexical records: entities, translations, forms and their links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A lexical item (a word) with its classification tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier.
    pub id: String,
    /// Surface text (the dictionary form).
    pub text: String,
    /// Coarse category, e.g. "verb" or "noun".
    pub category: String,
    /// Unordered tag set.
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Entity {
    /// Create a new entity with no tags.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.into(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add multiple tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Check whether the entity carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Auxiliary verb used to build compound tenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Auxiliary {
    /// "avere"
    Avere,
    /// "essere"
    Essere,
}

impl Auxiliary {
    /// All auxiliaries, in declaration order.
    pub const ALL: [Auxiliary; 2] = [Auxiliary::Avere, Auxiliary::Essere];

    /// The metadata value for this auxiliary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Auxiliary::Avere => "avere",
            Auxiliary::Essere => "essere",
        }
    }

    /// The role tag a compound form built with this auxiliary carries.
    pub fn role_tag(&self) -> &'static str {
        match self {
            Auxiliary::Avere => "avere-auxiliary",
            Auxiliary::Essere => "essere-auxiliary",
        }
    }

    /// Parse a metadata value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "avere" => Some(Auxiliary::Avere),
            "essere" => Some(Auxiliary::Essere),
            _ => None,
        }
    }

    /// Parse a role tag.
    pub fn from_role_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|aux| aux.role_tag() == tag)
    }
}

impl std::fmt::Display for Auxiliary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known keys of the translation context map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    /// Auxiliary choice for this meaning.
    Auxiliary,
    /// Transitivity of this meaning.
    Transitivity,
    /// Register (formal, colloquial, ...).
    Register,
    /// Free-form usage note.
    Usage,
}

impl MetadataKey {
    /// All known keys.
    pub const ALL: [MetadataKey; 4] = [
        MetadataKey::Auxiliary,
        MetadataKey::Transitivity,
        MetadataKey::Register,
        MetadataKey::Usage,
    ];

    /// The serialized key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Auxiliary => "auxiliary",
            MetadataKey::Transitivity => "transitivity",
            MetadataKey::Register => "register",
            MetadataKey::Usage => "usage",
        }
    }

    /// Look up a known key by name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Context metadata attached to a translation.
///
/// Known keys are typed fields; anything else lands in `extra` and survives
/// a round trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    /// Raw auxiliary value. Kept as a string so invalid values remain visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitivity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Unknown keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContextMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auxiliary value.
    pub fn with_auxiliary(mut self, value: impl Into<String>) -> Self {
        self.auxiliary = Some(value.into());
        self
    }

    /// The auxiliary, if present and valid.
    pub fn parsed_auxiliary(&self) -> Option<Auxiliary> {
        self.auxiliary.as_deref().and_then(Auxiliary::parse)
    }

    fn slot(&self, key: MetadataKey) -> &Option<String> {
        match key {
            MetadataKey::Auxiliary => &self.auxiliary,
            MetadataKey::Transitivity => &self.transitivity,
            MetadataKey::Register => &self.register,
            MetadataKey::Usage => &self.usage,
        }
    }

    fn slot_mut(&mut self, key: MetadataKey) -> &mut Option<String> {
        match key {
            MetadataKey::Auxiliary => &mut self.auxiliary,
            MetadataKey::Transitivity => &mut self.transitivity,
            MetadataKey::Register => &mut self.register,
            MetadataKey::Usage => &mut self.usage,
        }
    }

    /// Get a value by key name, rendering unknown keys as strings.
    pub fn get(&self, key: &str) -> Option<String> {
        match MetadataKey::parse(key) {
            Some(known) => self.slot(known).clone(),
            None => self.extra.get(key).map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    /// Set a value, returning the previous one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        match MetadataKey::parse(key) {
            Some(known) => self.slot_mut(known).replace(value),
            None => self
                .extra
                .insert(key.to_string(), serde_json::Value::String(value))
                .map(|v| v.to_string()),
        }
    }

    /// Remove a value, returning it.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        match MetadataKey::parse(key) {
            Some(known) => self.slot_mut(known).take(),
            None => self.extra.remove(key).map(|v| v.to_string()),
        }
    }
}

/// A meaning of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Stable identifier.
    pub id: String,
    /// Owning entity.
    pub entity_id: String,
    /// The meaning, in the target language.
    pub meaning: String,
    /// Context metadata.
    #[serde(default)]
    pub context: ContextMetadata,
    /// Display priority (lower shows first).
    #[serde(default)]
    pub display_priority: i32,
    /// Forms this meaning applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_ids: Option<Vec<String>>,
}

impl Translation {
    /// Create a new translation.
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            meaning: meaning.into(),
            context: ContextMetadata::default(),
            display_priority: 0,
            form_ids: None,
        }
    }

    /// Set the context metadata.
    pub fn with_context(mut self, context: ContextMetadata) -> Self {
        self.context = context;
        self
    }

    /// Set the referenced form ids.
    pub fn with_form_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.form_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Referenced form ids, empty when absent.
    pub fn form_refs(&self) -> &[String] {
        self.form_ids.as_deref().unwrap_or(&[])
    }
}

/// A realized grammatical variant of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    /// Stable identifier.
    pub id: String,
    /// Owning entity.
    pub entity_id: String,
    /// Realized text, e.g. "ho parlato".
    pub text: String,
    /// Grammatical feature tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Phonetic spelling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    /// IPA transcription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipa: Option<String>,
}

impl Form {
    /// Create a new form with no tags.
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            text: text.into(),
            tags: Vec::new(),
            phonetic: None,
            ipa: None,
        }
    }

    /// Add multiple tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Check whether the form carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The auxiliary role tag on this form, if any.
    pub fn auxiliary_role(&self) -> Option<Auxiliary> {
        self.tags.iter().find_map(|t| Auxiliary::from_role_tag(t))
    }
}

/// Many-to-many join between forms and translations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormTranslationLink {
    /// Linked form.
    pub form_id: String,
    /// Linked translation.
    pub translation_id: String,
}

impl FormTranslationLink {
    /// Create a new link.
    pub fn new(form_id: impl Into<String>, translation_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            translation_id: translation_id.into(),
        }
    }
}
