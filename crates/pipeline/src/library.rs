//! In-memory prompt library — useful for testing and embedded setups.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use loreweave_core::error::{Error, Result};
use loreweave_core::source::{PromptDefinition, PromptLibrary};

/// A `PromptLibrary` backed by a HashMap. Platforms with persistence supply
/// their own implementation.
pub struct InMemoryLibrary {
    sources: Mutex<HashMap<String, PromptDefinition>>,
    banned: Mutex<HashSet<String>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self {
            sources: Mutex::new(HashMap::new()),
            banned: Mutex::new(HashSet::new()),
        }
    }

    /// Register a definition under its id.
    pub fn insert(&self, definition: PromptDefinition) {
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(definition.id.clone(), definition);
    }

    /// Mark a source as banned; fetching it becomes `Forbidden`.
    pub fn ban(&self, source_id: &str) {
        self.banned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source_id.to_string());
    }
}

impl Default for InMemoryLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptLibrary for InMemoryLibrary {
    fn fetch(&self, source_id: &str) -> Result<PromptDefinition> {
        if self
            .banned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(source_id)
        {
            return Err(Error::forbidden(format!("source '{source_id}' is banned")));
        }
        self.sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(source_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("content source '{source_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_not_found() {
        let lib = InMemoryLibrary::new();
        let err = lib.fetch("ghost").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn banned_source_is_forbidden() {
        let lib = InMemoryLibrary::new();
        let mut def = PromptDefinition::default();
        def.id = "p1".into();
        lib.insert(def);
        lib.ban("p1");
        let err = lib.fetch("p1").unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
    }

    #[test]
    fn registered_source_fetches() {
        let lib = InMemoryLibrary::new();
        let mut def = PromptDefinition::default();
        def.id = "p1".into();
        lib.insert(def);
        assert_eq!(lib.fetch("p1").unwrap().id, "p1");
    }
}
