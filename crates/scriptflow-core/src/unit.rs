//! Unit model shared by actions and pipes: spec nodes and typed params.

use serde_json::{Map, Number, Value};

use scriptflow_protocols::compare::coerce_str;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamKind, ParamSpec, Schema};

use crate::pipeline::Pipeline;
use crate::registry::Resolver;

/// Keys of a spec node that are not params.
const RESERVED_KEYS: [&str; 3] = ["type", "id", "children"];

/// A parsed `{ type, id?, ...params, children? }` node of a script spec.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub type_name: String,
    pub id: String,
    pub params: Map<String, Value>,
    pub children: Vec<Value>,
}

impl UnitSpec {
    pub fn parse(value: &Value) -> Result<Self, EngineError> {
        let object = value.as_object().ok_or_else(|| {
            EngineError::invalid_script("Unit spec must be an object")
                .with_details(serde_json::json!({ "spec": value }))
        })?;
        let type_name = match object.get("type") {
            Some(Value::String(t)) if !t.is_empty() => t.clone(),
            _ => {
                return Err(EngineError::invalid_script("Unit spec is missing a type")
                    .with_details(serde_json::json!({ "spec": value })));
            }
        };
        let id = match object.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let children = match object.get("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(EngineError::invalid_script(format!(
                    "{}: children must be an array",
                    type_name
                )));
            }
        };
        let params = object
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            type_name,
            id,
            params,
            children,
        })
    }
}

/// A coerced parameter value.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    Keys(Vec<String>),
    Recordset(Vec<Map<String, Value>>),
    Pipeline(Pipeline),
    Json(Value),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Spec form of the value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => number_to_json(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Keys(keys) => Value::Array(keys.iter().cloned().map(Value::String).collect()),
            Self::Recordset(rows) => Value::Array(rows.iter().cloned().map(Value::Object).collect()),
            Self::Pipeline(pipeline) => pipeline.to_spec(),
            Self::Json(value) => value.clone(),
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Param values of one unit, in schema order.
#[derive(Debug, Clone, Default)]
pub struct Params {
    type_name: String,
    values: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn missing(&self, name: &str) -> EngineError {
        EngineError::invalid_script(format!("{}: parameter {} is required", self.type_name, name))
    }

    fn mismatch(&self, name: &str, expected: &str) -> EngineError {
        EngineError::invalid_script(format!(
            "{}: parameter {} must be {}",
            self.type_name, name, expected
        ))
    }

    /// A non-empty string param.
    pub fn str(&self, name: &str) -> Result<&str, EngineError> {
        match self.get(name) {
            Some(ParamValue::String(s)) if !s.is_empty() => Ok(s),
            Some(ParamValue::String(_)) | Some(ParamValue::Null) | None => Err(self.missing(name)),
            Some(_) => Err(self.mismatch(name, "a string")),
        }
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, EngineError> {
        match self.get(name) {
            Some(ParamValue::Number(n)) => Ok(*n),
            Some(ParamValue::Null) | None => Err(self.missing(name)),
            Some(_) => Err(self.mismatch(name, "a number")),
        }
    }

    pub fn opt_number(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(ParamValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// A boolean param; absent means `false`.
    pub fn bool(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ParamValue::Boolean(true)))
    }

    pub fn keys(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(ParamValue::Keys(keys)) => keys.clone(),
            _ => Vec::new(),
        }
    }

    pub fn recordset(&self, name: &str) -> Vec<Map<String, Value>> {
        match self.get(name) {
            Some(ParamValue::Recordset(rows)) => rows.clone(),
            _ => Vec::new(),
        }
    }

    /// A pipeline param; absent means the empty (identity) pipeline.
    pub fn pipeline(&self, name: &str) -> Pipeline {
        match self.get(name) {
            Some(ParamValue::Pipeline(pipeline)) => pipeline.clone(),
            _ => Pipeline::default(),
        }
    }

    pub fn json(&self, name: &str) -> Value {
        match self.get(name) {
            Some(value) => value.to_json(),
            None => Value::Null,
        }
    }

    /// All nested pipelines, in param order.
    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.values.iter().filter_map(|(_, v)| match v {
            ParamValue::Pipeline(p) => Some(p),
            _ => None,
        })
    }

    /// Spec form of the params. Null values are omitted.
    pub fn to_json(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect()
    }
}

/// Read the params declared by `schema` from a spec.
///
/// Each value is taken from the unit JSON, then the declared default, then the
/// `existing` params (first non-null wins), and coerced to its declared
/// kind.
pub fn read_params(
    type_name: &str,
    schema: &Schema,
    spec: &Map<String, Value>,
    existing: Option<&Params>,
    resolver: &Resolver,
) -> Result<Params, EngineError> {
    let mut params = Params::new(type_name);
    for param in schema.iter() {
        let from_spec = spec
            .get(&param.name)
            .filter(|v| !v.is_null())
            .or(param.default.as_ref().filter(|v| !v.is_null()));
        let value = match from_spec {
            Some(raw) => coerce(type_name, param, raw, resolver)?,
            None => existing
                .and_then(|e| e.get(&param.name))
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or(ParamValue::Null),
        };
        if param.required && value.is_null() {
            return Err(params.missing(&param.name));
        }
        params.set(param.name.clone(), value);
    }
    Ok(params)
}

fn coerce(
    type_name: &str,
    param: &ParamSpec,
    raw: &Value,
    resolver: &Resolver,
) -> Result<ParamValue, EngineError> {
    let invalid = |expected: &str| {
        EngineError::invalid_script(format!(
            "{}: parameter {} must be {}",
            type_name, param.name, expected
        ))
        .with_details(serde_json::json!({ "param": param.name, "value": raw }))
    };

    match &param.kind {
        ParamKind::String => match raw {
            Value::String(s) => Ok(ParamValue::String(s.clone())),
            Value::Number(_) | Value::Bool(_) => Ok(ParamValue::String(coerce_str(raw).into_owned())),
            _ => Err(invalid("a string")),
        },
        ParamKind::Number => match raw {
            Value::Number(n) => n.as_f64().map(ParamValue::Number).ok_or_else(|| invalid("a number")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(ParamValue::Number)
                .map_err(|_| invalid("a number")),
            _ => Err(invalid("a number")),
        },
        ParamKind::Boolean => match raw {
            Value::Bool(b) => Ok(ParamValue::Boolean(*b)),
            Value::String(s) if s == "true" => Ok(ParamValue::Boolean(true)),
            Value::String(s) if s == "false" => Ok(ParamValue::Boolean(false)),
            _ => Err(invalid("a boolean")),
        },
        ParamKind::Enum(allowed) => match raw {
            Value::String(s) if allowed.contains(s) => Ok(ParamValue::String(s.clone())),
            _ => Err(invalid(&format!("one of {}", allowed.join(", ")))),
        },
        ParamKind::Keys => match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(invalid("a list of strings")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::Keys),
            Value::String(s) => Ok(ParamValue::Keys(
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            _ => Err(invalid("a list of strings")),
        },
        ParamKind::Recordset => match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_object().cloned().ok_or_else(|| invalid("a list of objects")))
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::Recordset),
            _ => Err(invalid("a list of objects")),
        },
        ParamKind::Pipeline => resolver.load_pipeline(raw).map(ParamValue::Pipeline),
        ParamKind::Json => Ok(ParamValue::Json(raw.clone())),
    }
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
