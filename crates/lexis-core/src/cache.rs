//! Session-scoped lookup cache.
//!
//! Created by the caller and passed into each validation run, so its
//! lifetime is one session and nothing is shared between sessions.

use crate::model::Auxiliary;
use std::collections::HashMap;

/// What a form's text says about it, independent of its tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextTraits {
    /// Text matches the auxiliary+content pattern.
    pub compound: bool,
    /// Auxiliary implied by the leading word, if recognizable.
    pub leading_auxiliary: Option<Auxiliary>,
    /// Name of the first out-of-scope pattern the text matches.
    pub deprecated: Option<String>,
}

/// Memoizes text classification, keyed by `"<catalog version>/<text>"`.
#[derive(Debug, Default)]
pub struct LookupCache {
    traits: HashMap<String, TextTraits>,
    hits: u64,
    misses: u64,
}

impl LookupCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached traits for a text, computing them on a miss.
    pub fn text_traits<F>(&mut self, catalog_version: u32, text: &str, compute: F) -> TextTraits
    where
        F: FnOnce(&str) -> TextTraits,
    {
        let key = format!("{}/{}", catalog_version, text);
        if let Some(found) = self.traits.get(&key) {
            self.hits += 1;
            return found.clone();
        }
        self.misses += 1;
        let computed = compute(text);
        self.traits.insert(key, computed.clone());
        computed
    }

    /// Cache hits so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Cache misses so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Drop every entry and reset counters.
    pub fn clear(&mut self) {
        self.traits.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_after_miss() {
        let mut cache = LookupCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            cache.text_traits(1, "ho parlato", |_| {
                calls += 1;
                TextTraits {
                    compound: true,
                    leading_auxiliary: Some(Auxiliary::Avere),
                    deprecated: None,
                }
            });
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_catalog_version_is_part_of_key() {
        let mut cache = LookupCache::new();
        cache.text_traits(1, "parlo", |_| TextTraits::default());
        cache.text_traits(2, "parlo", |_| TextTraits::default());
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }
}
