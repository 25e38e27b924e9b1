//! Base registry shared by the pipe and action type tables.

use dashmap::DashMap;
use std::sync::Arc;

use scriptflow_protocols::error::RegistryError;
use scriptflow_protocols::types::UnitKind;

/// Trait for items that can be stored in a registry.
pub trait Registerable: Send + Sync {
    /// Returns the unique identifier for this item.
    fn registry_id(&self) -> &str;
}

/// Registry of items keyed by their registry id.
///
/// # Type Parameters
///
/// * `T` - The trait object type to store (e.g., `dyn PipeType`)
pub struct BaseRegistry<T: ?Sized + Registerable> {
    kind: UnitKind,
    items: DashMap<String, Arc<T>>,
}

impl<T: ?Sized + Registerable> BaseRegistry<T> {
    /// Create a new empty registry for units of `kind`.
    pub fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            items: DashMap::new(),
        }
    }

    /// Register an item.
    ///
    /// Returns an error if an item with the same ID is already registered.
    pub fn register(&self, item: Arc<T>) -> Result<(), RegistryError> {
        let id = item.registry_id().to_string();

        if self.items.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered {
                kind: self.kind,
                type_name: id,
            });
        }

        self.items.insert(id, item);
        Ok(())
    }

    /// Unregister an item by ID.
    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.items
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound {
                kind: self.kind,
                type_name: id.to_string(),
            })?;
        Ok(())
    }

    /// Get an item by ID.
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|item| item.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.iter().map(|item| item.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
