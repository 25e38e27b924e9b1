//! Declarative parameter metadata of actions and pipes.
//!
//! Each concrete type builds an ordered [`Schema`]. Specialized types reuse a
//! base schema through [`Schema::extend`]: base params keep their slots,
//! params the derived schema redefines replace them in place, new params are
//! appended.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a parameter, used to coerce spec values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Enum(Vec<String>),
    /// List of strings; a comma-separated string is also accepted.
    Keys,
    /// List of objects.
    Recordset,
    /// Nested pipeline, instantiated recursively.
    Pipeline,
    /// Any JSON value, kept as is.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            required: false,
            label: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            name,
            ParamKind::Enum(values.iter().map(|v| v.to_string()).collect()),
        )
    }

    pub fn keys(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Keys)
    }

    pub fn recordset(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Recordset)
    }

    pub fn pipeline(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Pipeline)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Json)
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered parameter list, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    params: Vec<ParamSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a param. Redefining a name replaces the earlier definition in its
    /// original slot.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.insert(spec);
        self
    }

    /// This schema layered over `base`.
    pub fn extend(self, base: &Schema) -> Self {
        let mut merged = base.clone();
        for spec in self.params {
            merged.insert(spec);
        }
        merged
    }

    fn insert(&mut self, spec: ParamSpec) {
        match self.params.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.params.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
