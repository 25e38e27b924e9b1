//! Value sources and scalar transforms.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipe::{Pipe, PipeDef};
use scriptflow_protocols::compare::{any_contains, any_equals, coerce_str, str_contains};
use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

use super::emit;

/// Constant value. A string holding JSON text is parsed; any other string
/// is taken literally.
pub struct GetJson {
    value: Value,
}

impl GetJson {
    pub fn new(raw: Value) -> Self {
        let value = match raw {
            Value::String(s) => serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s)),
            other => other,
        };
        Self { value }
    }
}

#[async_trait]
impl Pipe for GetJson {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Ok(emit(&input, self.value.clone()))
    }
}

/// Script-wide global by key.
pub struct GetGlobal {
    key: String,
    optional: bool,
}

#[async_trait]
impl Pipe for GetGlobal {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let value = match ctx.globals().get(&self.key) {
            Some(value) => value,
            None if self.optional => Value::Null,
            None => {
                return Err(EngineError::playback_code(
                    "GlobalNotFound",
                    format!("Global {} is not set", self.key),
                )
                .with_details(json!({ "key": self.key })));
            }
        };
        Ok(emit(&input, value))
    }
}

/// Script input by key. Optional inputs never block.
pub struct GetInput {
    key: String,
    optional: bool,
}

#[async_trait]
impl Pipe for GetInput {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let value = match ctx.io().peek_input(&self.key) {
            Some(value) => value,
            None if self.optional => Value::Null,
            None => ctx.io().request_input(&self.key).await?,
        };
        Ok(emit(&input, value))
    }
}

pub struct ContainsText {
    text: String,
    case_sensitive: bool,
}

#[async_trait]
impl Pipe for ContainsText {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Ok(input
            .iter()
            .map(|el| {
                let haystack = coerce_str(el.value());
                let found = if self.case_sensitive {
                    haystack.contains(self.text.as_str())
                } else {
                    str_contains(&haystack, &self.text)
                };
                el.clone_with(Value::Bool(found))
            })
            .collect())
    }
}

pub struct Equals {
    value: Value,
}

#[async_trait]
impl Pipe for Equals {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Ok(input
            .iter()
            .map(|el| el.clone_with(Value::Bool(any_equals(el.value(), &self.value))))
            .collect())
    }
}

pub struct Contains {
    value: Value,
}

#[async_trait]
impl Pipe for Contains {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Ok(input
            .iter()
            .map(|el| el.clone_with(Value::Bool(any_contains(el.value(), &self.value))))
            .collect())
    }
}

/// Dotted path into objects and arrays, e.g. `items.0.price`.
pub struct GetPath {
    path: Vec<String>,
    optional: bool,
}

impl GetPath {
    pub fn new(path: &str, optional: bool) -> Self {
        Self {
            path: path.split('.').filter(|s| !s.is_empty()).map(str::to_string).collect(),
            optional,
        }
    }

    fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.path.iter().try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

#[async_trait]
impl Pipe for GetPath {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        input
            .iter()
            .map(|el| match self.lookup(el.value()) {
                Some(found) => Ok(el.clone_with(found.clone())),
                None if self.optional => Ok(el.clone_with(Value::Null)),
                None => Err(EngineError::playback_code(
                    "PathNotFound",
                    format!("Path {} not found", self.path.join(".")),
                )
                .with_details(json!({ "path": self.path.join("."), "value": el.value() }))),
            })
            .collect()
    }
}

/// Elements bound to a local in the current scope.
pub struct GetLocal {
    key: String,
}

#[async_trait]
impl Pipe for GetLocal {
    async fn apply(&self, _input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        ctx.get_local(&self.key)
    }
}

/// Evaluates a named definition per input element.
pub struct CallDefinition {
    definition_id: String,
}

#[async_trait]
impl Pipe for CallDefinition {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        ctx.eval_definition(&self.definition_id, input).await
    }
}

pub(super) fn defs() -> Vec<PipeDef> {
    vec![
        PipeDef::new(
            "Value.getJson",
            Schema::new().param(ParamSpec::json("value")),
            |params| Ok(Arc::new(GetJson::new(params.json("value"))) as Arc<dyn Pipe>),
        ),
        PipeDef::new(
            "Value.getGlobal",
            Schema::new()
                .param(ParamSpec::string("key").required())
                .param(ParamSpec::boolean("optional")),
            |params| {
                Ok(Arc::new(GetGlobal {
                    key: params.str("key")?.to_string(),
                    optional: params.bool("optional"),
                }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new(
            "Value.getInput",
            Schema::new()
                .param(ParamSpec::string("key").required())
                .param(ParamSpec::boolean("optional")),
            |params| {
                Ok(Arc::new(GetInput {
                    key: params.str("key")?.to_string(),
                    optional: params.bool("optional"),
                }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new(
            "Value.containsText",
            Schema::new()
                .param(ParamSpec::string("text").required())
                .param(ParamSpec::boolean("caseSensitive")),
            |params| {
                Ok(Arc::new(ContainsText {
                    text: params.str("text")?.to_string(),
                    case_sensitive: params.bool("caseSensitive"),
                }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new(
            "Value.equals",
            Schema::new().param(ParamSpec::json("value")),
            |params| Ok(Arc::new(Equals { value: params.json("value") }) as Arc<dyn Pipe>),
        ),
        PipeDef::new(
            "Value.contains",
            Schema::new().param(ParamSpec::json("value")),
            |params| Ok(Arc::new(Contains { value: params.json("value") }) as Arc<dyn Pipe>),
        ),
        PipeDef::new(
            "Value.getPath",
            Schema::new()
                .param(ParamSpec::string("path").required())
                .param(ParamSpec::boolean("optional")),
            |params| Ok(Arc::new(GetPath::new(params.str("path")?, params.bool("optional"))) as Arc<dyn Pipe>),
        ),
        PipeDef::new(
            "Value.getLocal",
            Schema::new().param(ParamSpec::string("key").required()),
            |params| {
                Ok(Arc::new(GetLocal {
                    key: params.str("key")?.to_string(),
                }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new(
            "Definition.call",
            Schema::new().param(ParamSpec::string("definitionId").required()),
            |params| {
                Ok(Arc::new(CallDefinition {
                    definition_id: params.str("definitionId")?.to_string(),
                }) as Arc<dyn Pipe>)
            },
        ),
    ]
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
