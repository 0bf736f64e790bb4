//! Data model for the lexical dataset.
//!
//! Entities own translations and forms; links join forms to translations.
//! These types are read-only to the engine except through generated
//! statements.

mod dataset;
mod entity;

pub use dataset::{Column, Dataset, EntityBundle, Table};
pub use entity::{
    Auxiliary, ContextMetadata, Entity, Form, FormTranslationLink, MetadataKey, Translation,
};
