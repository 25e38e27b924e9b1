//! Pipe contracts and configured pipe nodes.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::Schema;
use scriptflow_protocols::types::UnitKind;

use crate::context::{IntrospectionEntry, RuntimeCtx};
use crate::unit::Params;

/// A transformation step.
///
/// `apply` consumes the current element set and returns a new one. It must
/// not mutate the input elements; new values are produced with
/// [`Element::clone_with`]. Page interaction is allowed.
#[async_trait]
pub trait Pipe: Send + Sync {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError>;
}

/// A pipe "class": type name, param schema and factory.
pub trait PipeType: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    fn create(&self, params: &Params) -> Result<Arc<dyn Pipe>, EngineError>;
}

type PipeFactory = dyn Fn(&Params) -> Result<Arc<dyn Pipe>, EngineError> + Send + Sync;

/// Closure-backed [`PipeType`].
pub struct PipeDef {
    type_name: String,
    schema: Schema,
    factory: Box<PipeFactory>,
}

impl PipeDef {
    pub fn new<F>(type_name: impl Into<String>, schema: Schema, factory: F) -> Self
    where
        F: Fn(&Params) -> Result<Arc<dyn Pipe>, EngineError> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            schema,
            factory: Box::new(factory),
        }
    }
}

impl PipeType for PipeDef {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn create(&self, params: &Params) -> Result<Arc<dyn Pipe>, EngineError> {
        (self.factory)(params)
    }
}

/// Stand-in for a type name with no registered implementation.
pub(crate) struct UnresolvedPipeType {
    type_name: String,
    schema: Schema,
}

impl UnresolvedPipeType {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            schema: Schema::new(),
        }
    }
}

impl PipeType for UnresolvedPipeType {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn create(&self, _params: &Params) -> Result<Arc<dyn Pipe>, EngineError> {
        Ok(Arc::new(UnresolvedPipe {
            type_name: self.type_name.clone(),
        }))
    }
}

struct UnresolvedPipe {
    type_name: String,
}

#[async_trait]
impl Pipe for UnresolvedPipe {
    async fn apply(&self, _input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Err(EngineError::unresolved(UnitKind::Pipe, &self.type_name))
    }
}

/// A configured pipe inside a pipeline.
pub struct PipeNode {
    id: String,
    type_name: String,
    params: Params,
    /// Raw params of unresolved pipes, kept for serialization.
    raw: Option<Map<String, Value>>,
    pipe: Arc<dyn Pipe>,
}

impl PipeNode {
    pub fn new(
        id: impl Into<String>,
        type_name: impl Into<String>,
        params: Params,
        pipe: Arc<dyn Pipe>,
    ) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            params,
            raw: None,
            pipe,
        }
    }

    pub(crate) fn with_raw(mut self, raw: Map<String, Value>) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Whether the pipe type was known when the script was loaded.
    pub fn is_resolved(&self) -> bool {
        self.raw.is_none()
    }

    /// Apply the pipe, checking for interruption first.
    pub async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        ctx.tick()?;
        let input_count = input.len();
        let started = Instant::now();
        let entry = IntrospectionEntry::start(UnitKind::Pipe.into(), &self.id, &self.type_name, input_count);
        let result = self.pipe.apply(input, ctx).await;
        ctx.introspection().record(|| entry.finish(started, &result));
        result
    }

    pub fn to_spec(&self) -> Value {
        let mut spec = Map::new();
        spec.insert("type".to_string(), Value::String(self.type_name.clone()));
        spec.insert("id".to_string(), Value::String(self.id.clone()));
        let params = match &self.raw {
            Some(raw) => raw.clone(),
            None => self.params.to_json(),
        };
        spec.extend(params);
        Value::Object(spec)
    }
}

impl std::fmt::Debug for PipeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeNode")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .finish()
    }
}
