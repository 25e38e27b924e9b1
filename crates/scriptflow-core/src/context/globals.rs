//! Script-wide key/value store.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Globals of one script session.
///
/// Each operation takes the lock once, so a write is never partially
/// visible.
#[derive(Debug, Default)]
pub struct Globals {
    values: RwLock<HashMap<String, Value>>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    /// Append to the array stored under `key`.
    ///
    /// A missing or null key starts a new array; a scalar is wrapped into an
    /// array before appending.
    pub fn append(&self, key: impl Into<String>, value: Value) {
        let mut values = self.values.write();
        let slot = values.entry(key.into()).or_insert(Value::Null);
        match slot {
            Value::Array(items) => items.push(value),
            Value::Null => *slot = Value::Array(vec![value]),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value]);
            }
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Copy of all globals as a JSON object.
    pub fn snapshot(&self) -> Value {
        let values = self.values.read();
        Value::Object(values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
