//! Element model: the unit of data flowing through pipelines.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EngineError;

/// Reference to a logical position in a target document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeRef {
    /// Top-level node of a document. Fresh documents are created for values
    /// that are not anchored to the page (constants, fold results).
    Document { id: Uuid },

    /// A node of the live page, addressed by the page's own node id.
    #[serde(rename_all = "camelCase")]
    Dom {
        node_id: String,
        description: String,
    },
}

impl NodeRef {
    /// A new, unique document node.
    pub fn new_document() -> Self {
        Self::Document { id: Uuid::new_v4() }
    }

    pub fn dom(node_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Dom {
            node_id: node_id.into(),
            description: description.into(),
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }

    /// Human-readable description of the node.
    pub fn description(&self) -> &str {
        match self {
            Self::Document { .. } => "#document",
            Self::Dom { description, .. } => description,
        }
    }
}

/// A JSON value bound to a node.
///
/// Values are immutable once produced: transformations create new elements
/// with [`Element::clone_with`], which keeps the node and replaces the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    node: NodeRef,
    value: Value,
}

impl Element {
    pub fn new(node: NodeRef, value: Value) -> Self {
        Self { node, value }
    }

    /// An element anchored to a fresh top-level document node.
    pub fn document(value: Value) -> Self {
        Self::new(NodeRef::new_document(), value)
    }

    /// A new element sharing this element's node with a different value.
    pub fn clone_with(&self, value: Value) -> Self {
        Self {
            node: self.node.clone(),
            value,
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn description(&self) -> &str {
        self.node.description()
    }

    pub fn as_str(&self) -> Result<&str, EngineError> {
        self.value
            .as_str()
            .ok_or_else(|| EngineError::value_type("string", &self.value))
    }

    pub fn as_f64(&self) -> Result<f64, EngineError> {
        self.value
            .as_f64()
            .ok_or_else(|| EngineError::value_type("number", &self.value))
    }

    pub fn as_bool(&self) -> Result<bool, EngineError> {
        self.value
            .as_bool()
            .ok_or_else(|| EngineError::value_type("boolean", &self.value))
    }

    pub fn as_array(&self) -> Result<&Vec<Value>, EngineError> {
        self.value
            .as_array()
            .ok_or_else(|| EngineError::value_type("array", &self.value))
    }

    pub fn as_object(&self) -> Result<&Map<String, Value>, EngineError> {
        self.value
            .as_object()
            .ok_or_else(|| EngineError::value_type("object", &self.value))
    }
}

/// JSON type name used in type errors.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "element_tests.rs"]
mod tests;
