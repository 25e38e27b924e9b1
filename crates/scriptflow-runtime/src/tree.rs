//! Index-addressed action tree shared by all contexts of a script.

use std::collections::BTreeSet;

use scriptflow_core::action::{ActionKind, ActionUnit};
use scriptflow_core::context::Definition;
use scriptflow_core::pipeline::Pipeline;
use scriptflow_protocols::types::UnitKind;

/// One action in the arena.
#[derive(Debug)]
pub struct ActionNode {
    pub unit: ActionUnit,
    pub context: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl ActionNode {
    pub fn id(&self) -> &str {
        &self.unit.id
    }

    pub fn type_name(&self) -> &str {
        &self.unit.type_name
    }

    pub fn kind(&self) -> ActionKind {
        self.unit.kind()
    }
}

/// A named root of the tree.
#[derive(Debug)]
pub struct ScriptContext {
    pub name: String,
    /// Context `type` as found in the script JSON.
    pub type_name: String,
    /// Top-level actions, in order.
    pub actions: Vec<usize>,
    pub definitions: Vec<Definition>,
    /// Decides whether the context applies to the current page.
    pub matchers: Pipeline,
}

/// Arena of actions. Node indices are stable for the life of the script.
#[derive(Debug, Default)]
pub struct ActionTree {
    nodes: Vec<ActionNode>,
    contexts: Vec<ScriptContext>,
}

impl ActionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_context(&mut self, context: ScriptContext) -> usize {
        self.contexts.push(context);
        self.contexts.len() - 1
    }

    /// Append a node under `parent` (or as a root of `context`).
    pub(crate) fn add_node(&mut self, unit: ActionUnit, context: usize, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(ActionNode {
            unit,
            context,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(idx),
            None => self.contexts[context].actions.push(idx),
        }
        idx
    }

    pub fn node(&self, idx: usize) -> &ActionNode {
        &self.nodes[idx]
    }

    pub fn get(&self, idx: usize) -> Option<&ActionNode> {
        self.nodes.get(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contexts(&self) -> &[ScriptContext] {
        &self.contexts
    }

    pub fn context(&self, idx: usize) -> &ScriptContext {
        &self.contexts[idx]
    }

    pub fn context_index(&self, name: &str) -> Option<usize> {
        self.contexts.iter().position(|c| c.name == name)
    }

    pub fn find(&self, action_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.unit.id == action_id)
    }

    /// The list `idx` is a member of: its parent's children or the roots of
    /// its context.
    pub fn siblings(&self, idx: usize) -> &[usize] {
        let node = &self.nodes[idx];
        match node.parent {
            Some(p) => &self.nodes[p].children,
            None => &self.contexts[node.context].actions,
        }
    }

    /// Earlier siblings of `idx`, nearest first.
    pub fn preceding_siblings(&self, idx: usize) -> Vec<usize> {
        let siblings = self.siblings(idx);
        let pos = siblings.iter().position(|s| *s == idx).unwrap_or(0);
        siblings[..pos].iter().rev().copied().collect()
    }

    /// Ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = self.nodes[idx].parent;
        while let Some(p) = current {
            out.push(p);
            current = self.nodes[p].parent;
        }
        out
    }

    /// All descendants of `idx`, depth-first.
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[idx].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    /// Node addressed by `path` (child positions from the context roots).
    pub fn node_at(&self, context: usize, path: &[usize]) -> Option<usize> {
        let (first, rest) = path.split_first()?;
        let mut idx = *self.contexts.get(context)?.actions.get(*first)?;
        for pos in rest {
            idx = *self.nodes[idx].children.get(*pos)?;
        }
        Some(idx)
    }

    /// Path of `idx` within its context.
    pub fn path_of(&self, idx: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = idx;
        loop {
            let siblings = self.siblings(current);
            path.push(siblings.iter().position(|s| *s == current).unwrap_or(0));
            match self.nodes[current].parent {
                Some(p) => current = p,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Type names used in the tree that had no implementation at load time.
    pub fn unresolved_types(&self) -> Vec<(UnitKind, String)> {
        let mut actions = BTreeSet::new();
        let mut pipes = BTreeSet::new();
        let mut pipelines: Vec<&Pipeline> = Vec::new();

        for node in &self.nodes {
            if !node.unit.is_resolved() {
                actions.insert(node.unit.type_name.clone());
            }
            pipelines.extend(node.unit.params.pipelines());
        }
        for context in &self.contexts {
            pipelines.push(&context.matchers);
            pipelines.extend(context.definitions.iter().map(|d| &d.pipeline));
        }
        for pipe in pipelines.into_iter().flat_map(|p| p.descendant_pipes()) {
            if !pipe.is_resolved() {
                pipes.insert(pipe.type_name().to_string());
            }
        }

        actions
            .into_iter()
            .map(|name| (UnitKind::Action, name))
            .chain(pipes.into_iter().map(|name| (UnitKind::Pipe, name)))
            .collect()
    }

    /// Number of children of the node at `path`, or of the context roots for
    /// the empty path.
    pub fn child_count(&self, context: usize, path: &[usize]) -> usize {
        if path.is_empty() {
            return self.contexts.get(context).map(|c| c.actions.len()).unwrap_or(0);
        }
        self.node_at(context, path)
            .map(|idx| self.nodes[idx].children.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
