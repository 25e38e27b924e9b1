//! Named reusable pipelines.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub struct Definition {
    pub id: String,
    pub label: Option<String>,
    pub pipeline: Pipeline,
}

/// Definitions of all contexts of a script, keyed by id.
#[derive(Debug, Default)]
pub struct Definitions {
    items: RwLock<HashMap<String, Definition>>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing one with the same id.
    pub fn insert(&self, definition: Definition) {
        self.items.write().insert(definition.id.clone(), definition);
    }

    pub fn get(&self, id: &str) -> Option<Definition> {
        self.items.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }
}
