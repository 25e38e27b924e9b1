//! Script spec (de)serialization.

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use scriptflow_core::context::Definition;
use scriptflow_core::pipeline::Pipeline;
use scriptflow_core::registry::Resolver;
use scriptflow_core::unit::UnitSpec;
use scriptflow_protocols::error::EngineError;

use crate::tree::{ActionTree, ScriptContext};

/// A parsed script: its id and action tree.
#[derive(Debug)]
pub struct LoadedScript {
    pub id: String,
    pub tree: ActionTree,
}

/// Builds action trees from `{ id, contexts: [...] }` specs.
pub struct ScriptLoader<'a> {
    resolver: &'a Resolver,
    seen_ids: HashSet<String>,
    /// Definition ids share one namespace across contexts.
    seen_definitions: HashSet<String>,
}

impl<'a> ScriptLoader<'a> {
    pub fn new(resolver: &'a Resolver) -> Self {
        Self {
            resolver,
            seen_ids: HashSet::new(),
            seen_definitions: HashSet::new(),
        }
    }

    /// Read and load a JSON spec file.
    pub fn load_file(self, path: &Path) -> Result<LoadedScript, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::invalid_script(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let spec: Value = serde_json::from_str(&content)
            .map_err(|e| EngineError::invalid_script(format!("Script is not valid JSON: {}", e)))?;
        self.load(&spec)
    }

    pub fn load(mut self, spec: &Value) -> Result<LoadedScript, EngineError> {
        let object = spec
            .as_object()
            .ok_or_else(|| EngineError::invalid_script("Script spec must be an object"))?;
        let id = match object.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let contexts: &[Value] = match object.get("contexts") {
            Some(Value::Array(items)) => items.as_slice(),
            None | Some(Value::Null) => &[],
            Some(_) => return Err(EngineError::invalid_script("contexts must be an array")),
        };

        let mut tree = ActionTree::new();
        for (i, context) in contexts.iter().enumerate() {
            self.load_context(&mut tree, i, context)?;
        }
        debug!(script = %id, actions = tree.len(), contexts = tree.contexts().len(), "Script loaded");
        Ok(LoadedScript { id, tree })
    }

    fn load_context(&mut self, tree: &mut ActionTree, index: usize, spec: &Value) -> Result<(), EngineError> {
        let object = spec
            .as_object()
            .ok_or_else(|| EngineError::invalid_script("Context spec must be an object"))?;
        let type_name = str_field(object, "type").unwrap_or("context").to_string();
        let name = str_field(object, "name")
            .or_else(|| str_field(object, "id"))
            .map(str::to_string)
            .unwrap_or_else(|| if index == 0 { "main".to_string() } else { format!("context-{}", index) });
        if tree.context_index(&name).is_some() {
            return Err(EngineError::invalid_script(format!("Duplicate context {}", name)));
        }

        let matchers = match object.get("matchers") {
            Some(raw) => self.resolver.load_pipeline(raw)?,
            None => Pipeline::default(),
        };
        let definitions = match object.get("definitions") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.load_definition(item))
                .collect::<Result<Vec<_>, _>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(EngineError::invalid_script("definitions must be an array")),
        };

        let context = tree.add_context(ScriptContext {
            name,
            type_name,
            actions: Vec::new(),
            definitions,
            matchers,
        });

        let actions: &[Value] = match object.get("actions") {
            Some(Value::Array(items)) => items.as_slice(),
            None | Some(Value::Null) => &[],
            Some(_) => return Err(EngineError::invalid_script("actions must be an array")),
        };
        for action in actions {
            self.load_action(tree, context, None, action)?;
        }
        Ok(())
    }

    fn load_definition(&mut self, spec: &Value) -> Result<Definition, EngineError> {
        let object = spec
            .as_object()
            .ok_or_else(|| EngineError::invalid_script("Definition spec must be an object"))?;
        let id = str_field(object, "id")
            .ok_or_else(|| EngineError::invalid_script("Definition is missing an id"))?;
        if !self.seen_definitions.insert(id.to_string()) {
            return Err(EngineError::invalid_script(format!("Duplicate definition id {}", id))
                .with_details(serde_json::json!({ "id": id })));
        }
        let pipeline = self
            .resolver
            .load_pipeline(object.get("pipeline").unwrap_or(&Value::Null))?;
        Ok(Definition {
            id: id.to_string(),
            label: str_field(object, "label").map(str::to_string),
            pipeline,
        })
    }

    fn load_action(
        &mut self,
        tree: &mut ActionTree,
        context: usize,
        parent: Option<usize>,
        spec: &Value,
    ) -> Result<(), EngineError> {
        let unit = UnitSpec::parse(spec)?;
        if !self.seen_ids.insert(unit.id.clone()) {
            return Err(EngineError::invalid_script(format!("Duplicate action id {}", unit.id))
                .with_details(serde_json::json!({ "id": unit.id })));
        }
        let action = self.resolver.load_action(&unit)?;
        if !action.kind().has_children() && !unit.children.is_empty() {
            return Err(EngineError::invalid_script(format!(
                "{}: action cannot have children",
                action.type_name
            ))
            .with_details(serde_json::json!({ "id": unit.id })));
        }

        let idx = tree.add_node(action, context, parent);
        for child in &unit.children {
            self.load_action(tree, context, Some(idx), child)?;
        }
        Ok(())
    }
}

fn str_field<'v>(object: &'v Map<String, Value>, key: &str) -> Option<&'v str> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Spec form of a whole script.
pub fn script_to_spec(id: &str, tree: &ActionTree) -> Value {
    let contexts = tree
        .contexts()
        .iter()
        .map(|context| {
            let mut spec = Map::new();
            spec.insert("type".to_string(), Value::String(context.type_name.clone()));
            spec.insert("name".to_string(), Value::String(context.name.clone()));
            if !context.matchers.is_empty() {
                spec.insert("matchers".to_string(), context.matchers.to_spec());
            }
            if !context.definitions.is_empty() {
                let definitions = context
                    .definitions
                    .iter()
                    .map(|d| {
                        let mut def = Map::new();
                        def.insert("id".to_string(), Value::String(d.id.clone()));
                        if let Some(label) = &d.label {
                            def.insert("label".to_string(), Value::String(label.clone()));
                        }
                        def.insert("pipeline".to_string(), d.pipeline.to_spec());
                        Value::Object(def)
                    })
                    .collect();
                spec.insert("definitions".to_string(), Value::Array(definitions));
            }
            let actions = context.actions.iter().map(|idx| action_to_spec(tree, *idx)).collect();
            spec.insert("actions".to_string(), Value::Array(actions));
            Value::Object(spec)
        })
        .collect();

    serde_json::json!({ "id": id, "contexts": Value::Array(contexts) })
}

fn action_to_spec(tree: &ActionTree, idx: usize) -> Value {
    let node = tree.node(idx);
    let children = node.children.iter().map(|c| action_to_spec(tree, *c)).collect();
    node.unit.to_spec(children)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
