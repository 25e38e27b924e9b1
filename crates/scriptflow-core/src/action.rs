//! Action contracts and per-execution run state.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::Schema;
use scriptflow_protocols::types::UnitKind;

use crate::context::RuntimeCtx;
use crate::unit::Params;

/// How the playhead treats an action's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// No children.
    Leaf,
    /// Children are entered once unless bypassed.
    Block,
    /// Children are entered unless bypassed; when they finish, the playhead
    /// returns to the action itself.
    Loop,
}

impl ActionKind {
    pub fn has_children(&self) -> bool {
        !matches!(self, ActionKind::Leaf)
    }
}

/// Transient per-run state of one action, owned by the playback driver.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// `None` until the action ran; `Some(true)` skips its children.
    pub bypassed: Option<bool>,
    /// Loop iteration index.
    pub iteration: Option<usize>,
    /// Loop attempt counter.
    pub attempts: u32,
    /// Scope pushed for the children, if the action introduces one.
    pub scope: Option<Vec<Element>>,
    /// Cached result of the last exec.
    pub outcome: Option<Value>,
}

impl RunState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of a preceding sibling, used by chained actions.
#[derive(Debug, Clone)]
pub struct SiblingState {
    pub id: String,
    pub type_name: String,
    pub bypassed: Option<bool>,
}

/// What `exec` gets to work with.
pub struct ActionContext<'a> {
    pub runtime: RuntimeCtx,
    pub state: &'a mut RunState,
    preceding: Vec<SiblingState>,
}

impl<'a> ActionContext<'a> {
    /// `preceding` lists the earlier siblings, nearest first.
    pub fn new(runtime: RuntimeCtx, state: &'a mut RunState, preceding: Vec<SiblingState>) -> Self {
        Self {
            runtime,
            state,
            preceding,
        }
    }

    pub fn preceding_siblings(&self) -> &[SiblingState] {
        &self.preceding
    }

    /// Implicit input scope of the action.
    pub fn scope(&self) -> Vec<Element> {
        self.runtime.scope()
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.state.bypassed = Some(bypassed);
    }
}

/// An executable script step.
#[async_trait]
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind {
        ActionKind::Leaf
    }

    /// Perform the action's effect. Actions with children report whether
    /// the children should run through [`ActionContext::set_bypassed`].
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError>;

    /// Scope the children see. Defaults to the scope recorded by `exec`,
    /// falling back to the inherited one.
    fn children_scope(&self, state: &RunState, inherited: &[Element]) -> Vec<Element> {
        state.scope.clone().unwrap_or_else(|| inherited.to_vec())
    }
}

/// An action "class": type name, param schema and factory.
pub trait ActionType: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    fn create(&self, params: &Params) -> Result<Arc<dyn Action>, EngineError>;
}

type ActionFactory = dyn Fn(&Params) -> Result<Arc<dyn Action>, EngineError> + Send + Sync;

/// Closure-backed [`ActionType`].
pub struct ActionDef {
    type_name: String,
    schema: Schema,
    factory: Box<ActionFactory>,
}

impl ActionDef {
    pub fn new<F>(type_name: impl Into<String>, schema: Schema, factory: F) -> Self
    where
        F: Fn(&Params) -> Result<Arc<dyn Action>, EngineError> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            schema,
            factory: Box::new(factory),
        }
    }
}

impl ActionType for ActionDef {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn create(&self, params: &Params) -> Result<Arc<dyn Action>, EngineError> {
        (self.factory)(params)
    }
}

/// Stand-in type for an action type name with no registered implementation.
pub(crate) struct UnresolvedActionType {
    type_name: String,
    schema: Schema,
}

impl UnresolvedActionType {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            schema: Schema::new(),
        }
    }
}

impl ActionType for UnresolvedActionType {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn create(&self, _params: &Params) -> Result<Arc<dyn Action>, EngineError> {
        Ok(Arc::new(UnresolvedAction::new(self.type_name.clone())))
    }
}

/// Stand-in for an unknown action type. Keeps its children so the tree
/// still loads and serializes.
pub(crate) struct UnresolvedAction {
    type_name: String,
}

impl UnresolvedAction {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

#[async_trait]
impl Action for UnresolvedAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, _ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        Err(EngineError::unresolved(UnitKind::Action, &self.type_name))
    }
}

/// A configured action as loaded from a spec, without its children.
pub struct ActionUnit {
    pub id: String,
    pub type_name: String,
    pub params: Params,
    /// Raw params of unresolved actions, kept for serialization.
    pub raw: Option<Map<String, Value>>,
    pub action: Arc<dyn Action>,
}

impl ActionUnit {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    pub fn is_resolved(&self) -> bool {
        self.raw.is_none()
    }

    /// Spec form with the given child specs.
    pub fn to_spec(&self, children: Vec<Value>) -> Value {
        let mut spec = Map::new();
        spec.insert("type".to_string(), Value::String(self.type_name.clone()));
        spec.insert("id".to_string(), Value::String(self.id.clone()));
        let params = match &self.raw {
            Some(raw) => raw.clone(),
            None => self.params.to_json(),
        };
        spec.extend(params);
        if self.kind().has_children() {
            spec.insert("children".to_string(), Value::Array(children));
        }
        Value::Object(spec)
    }
}

impl std::fmt::Debug for ActionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionUnit")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .field("kind", &self.kind())
            .finish()
    }
}
