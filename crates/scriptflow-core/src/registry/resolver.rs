//! Type resolver: maps type names to pipe and action implementations.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use scriptflow_protocols::error::{EngineError, RegistryError};
use scriptflow_protocols::types::UnitKind;

use super::base::{BaseRegistry, Registerable};
use crate::action::{ActionType, ActionUnit, UnresolvedActionType};
use crate::pipe::{PipeNode, PipeType, UnresolvedPipeType};
use crate::pipeline::Pipeline;
use crate::unit::{read_params, Params, UnitSpec};

impl Registerable for dyn PipeType {
    fn registry_id(&self) -> &str {
        self.type_name()
    }
}

impl Registerable for dyn ActionType {
    fn registry_id(&self) -> &str {
        self.type_name()
    }
}

/// Legacy type names still found in stored scripts.
static LEGACY_RENAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Value.getConstant", "Value.getJson"),
        ("String.containsText", "Value.containsText"),
        ("Value.setGlobal", "Global.setGlobal"),
        ("Flow.forEach", "Flow.each"),
    ])
});

/// Registry of pipe and action types plus the rename map applied before
/// lookup.
pub struct Resolver {
    pipes: BaseRegistry<dyn PipeType>,
    actions: BaseRegistry<dyn ActionType>,
    renames: RwLock<HashMap<String, String>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// A resolver with the built-in legacy renames and no types.
    pub fn new() -> Self {
        let renames = LEGACY_RENAMES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self {
            pipes: BaseRegistry::new(UnitKind::Pipe),
            actions: BaseRegistry::new(UnitKind::Action),
            renames: RwLock::new(renames),
        }
    }

    pub fn add_rename(&self, from: impl Into<String>, to: impl Into<String>) {
        self.renames.write().insert(from.into(), to.into());
    }

    /// Current name of `name` after applying the rename map.
    pub fn canonical_name(&self, name: &str) -> String {
        self.renames
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn register_pipe(&self, pipe: Arc<dyn PipeType>) -> Result<(), RegistryError> {
        debug!(pipe = pipe.type_name(), "Registering pipe type");
        self.pipes.register(pipe)
    }

    pub fn register_action(&self, action: Arc<dyn ActionType>) -> Result<(), RegistryError> {
        debug!(action = action.type_name(), "Registering action type");
        self.actions.register(action)
    }

    pub fn has_pipe(&self, name: &str) -> bool {
        self.pipes.contains(&self.canonical_name(name))
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains(&self.canonical_name(name))
    }

    /// Pipe type for `name`; unknown names resolve to a sentinel whose
    /// pipes always fail.
    pub fn resolve_pipe(&self, name: &str) -> Arc<dyn PipeType> {
        let name = self.canonical_name(name);
        self.pipes
            .get(&name)
            .unwrap_or_else(|| Arc::new(UnresolvedPipeType::new(name)) as Arc<dyn PipeType>)
    }

    /// Action type for `name`; unknown names resolve to a sentinel whose
    /// actions always fail.
    pub fn resolve_action(&self, name: &str) -> Arc<dyn ActionType> {
        let name = self.canonical_name(name);
        self.actions
            .get(&name)
            .unwrap_or_else(|| Arc::new(UnresolvedActionType::new(name)) as Arc<dyn ActionType>)
    }

    pub fn list_pipes(&self) -> Vec<String> {
        self.pipes.list_ids()
    }

    pub fn list_actions(&self) -> Vec<String> {
        self.actions.list_ids()
    }

    pub fn pipe_type(&self, name: &str) -> Option<Arc<dyn PipeType>> {
        self.pipes.get(&self.canonical_name(name))
    }

    pub fn action_type(&self, name: &str) -> Option<Arc<dyn ActionType>> {
        self.actions.get(&self.canonical_name(name))
    }

    /// Instantiate one pipe from its spec.
    pub fn load_pipe(&self, spec: &Value) -> Result<PipeNode, EngineError> {
        let unit = UnitSpec::parse(spec)?;
        if !unit.children.is_empty() {
            return Err(EngineError::invalid_script(format!(
                "{}: pipes cannot have children",
                unit.type_name
            )));
        }
        let name = self.canonical_name(&unit.type_name);
        match self.pipes.get(&name) {
            Some(pipe_type) => {
                let params = read_params(&name, pipe_type.schema(), &unit.params, None, self)?;
                let pipe = pipe_type.create(&params)?;
                Ok(PipeNode::new(unit.id, name, params, pipe))
            }
            None => {
                warn!(pipe = %name, "Unresolved pipe type");
                let sentinel = UnresolvedPipeType::new(name.clone());
                let params = Params::new(name.clone());
                let pipe = sentinel.create(&params)?;
                Ok(PipeNode::new(unit.id, name, params, pipe).with_raw(unit.params))
            }
        }
    }

    /// Instantiate a pipeline from `[pipe, ...]` or `{ pipes: [...] }`.
    /// Null is the empty pipeline.
    pub fn load_pipeline(&self, spec: &Value) -> Result<Pipeline, EngineError> {
        let items = match spec {
            Value::Null => return Ok(Pipeline::default()),
            Value::Array(items) => items,
            Value::Object(object) => match object.get("pipes") {
                Some(Value::Array(items)) => items,
                None | Some(Value::Null) => return Ok(Pipeline::default()),
                Some(_) => return Err(pipeline_shape_error(spec)),
            },
            _ => return Err(pipeline_shape_error(spec)),
        };
        let pipes = items
            .iter()
            .map(|item| self.load_pipe(item).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Pipeline::new(pipes))
    }

    /// Instantiate one action from a parsed spec. Children are left to the
    /// caller.
    pub fn load_action(&self, unit: &UnitSpec) -> Result<ActionUnit, EngineError> {
        let name = self.canonical_name(&unit.type_name);
        match self.actions.get(&name) {
            Some(action_type) => {
                let params = read_params(&name, action_type.schema(), &unit.params, None, self)?;
                let action = action_type.create(&params)?;
                Ok(ActionUnit {
                    id: unit.id.clone(),
                    type_name: name,
                    params,
                    raw: None,
                    action,
                })
            }
            None => {
                warn!(action = %name, "Unresolved action type");
                let params = Params::new(name.clone());
                let action = UnresolvedActionType::new(name.clone()).create(&params)?;
                Ok(ActionUnit {
                    id: unit.id.clone(),
                    params,
                    action,
                    type_name: name,
                    raw: Some(unit.params.clone()),
                })
            }
        }
    }
}

fn pipeline_shape_error(spec: &Value) -> EngineError {
    EngineError::invalid_script("Pipeline must be an array of pipes or an object with pipes")
        .with_details(serde_json::json!({ "spec": spec }))
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
