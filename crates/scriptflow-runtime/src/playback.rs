//! Playback state machine.
//!
//! The playback driver is the only thing that executes actions. It holds the
//! playhead as a path of child positions, the per-action [`RunState`]s and
//! the locals stack, and advances with the pure transitions of
//! [`crate::transition`]. The locals stack always has one frame per path
//! element.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use scriptflow_core::action::{Action, ActionContext, RunState, SiblingState};
use scriptflow_core::context::{EntryKind, IntrospectionEntry, LocalsStack, RuntimeCtx};
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::types::{PlaybackMode, RunStatus};

use crate::transition::{after_run, Transition};
use crate::tree::ActionTree;

pub struct Playback {
    context: usize,
    path: Option<Vec<usize>>,
    mode: PlaybackMode,
    status: RunStatus,
    states: HashMap<usize, RunState>,
    locals: LocalsStack,
}

impl Playback {
    pub fn new(locals: LocalsStack) -> Self {
        Self {
            context: 0,
            path: None,
            mode: PlaybackMode::FullRun,
            status: RunStatus::Idle,
            states: HashMap::new(),
            locals,
        }
    }

    pub fn context(&self) -> usize {
        self.context
    }

    pub fn path(&self) -> Option<&[usize]> {
        self.path.as_deref()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
    }

    pub fn state(&self, node: usize) -> Option<&RunState> {
        self.states.get(&node)
    }

    /// Node under the playhead, `None` once finished.
    pub fn playhead(&self, tree: &ActionTree) -> Option<usize> {
        self.path
            .as_deref()
            .and_then(|path| tree.node_at(self.context, path))
    }

    /// Put the playhead on the first action of `context` with fresh state.
    pub fn start(&mut self, tree: &ActionTree, context: usize) {
        self.context = context;
        self.states.clear();
        self.locals.reset();
        self.path = (tree.child_count(context, &[]) > 0).then(|| vec![0]);
        self.status = RunStatus::Idle;
    }

    /// Move the playhead onto `node`, rebuilding the scope frames of its
    /// ancestors from their recorded state.
    pub fn set_playhead(&mut self, tree: &ActionTree, node: usize) {
        self.context = tree.node(node).context;
        self.locals.reset();
        let mut ancestors = tree.ancestors(node);
        ancestors.reverse();
        for ancestor in ancestors {
            let inherited = self.locals.scope();
            let state = self.states.get(&ancestor).cloned().unwrap_or_default();
            let scope = tree.node(ancestor).unit.action.children_scope(&state, &inherited);
            self.locals.push(scope);
        }
        self.reset_subtree(tree, node);
        self.path = Some(tree.path_of(node));
        debug!(action = tree.node(node).id(), "Playhead moved");
    }

    /// Stop with nothing left to run.
    pub fn finish(&mut self) {
        self.path = None;
        self.locals.reset();
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.states.clear();
        self.finish();
        self.status = RunStatus::Idle;
    }

    /// Execute the action under the playhead and advance.
    pub async fn step(&mut self, tree: &ActionTree, runtime: &RuntimeCtx) -> Result<Transition, EngineError> {
        let Some(path) = self.path.clone() else {
            return Ok(Transition::Finish);
        };
        runtime.tick()?;
        let idx = tree.node_at(self.context, &path).ok_or_else(|| {
            EngineError::invalid_script("Playhead points outside the action tree")
                .with_details(serde_json::json!({ "path": path }))
        })?;
        let node = tree.node(idx);
        let action: Arc<dyn Action> = node.unit.action.clone();
        let kind = action.kind();

        let preceding = tree
            .preceding_siblings(idx)
            .into_iter()
            .map(|s| SiblingState {
                id: tree.node(s).id().to_string(),
                type_name: tree.node(s).type_name().to_string(),
                bypassed: self.states.get(&s).and_then(|st| st.bypassed),
            })
            .collect();

        let action_runtime = runtime.for_action(node.id());
        let started = Instant::now();
        let entry = IntrospectionEntry::start(EntryKind::Action, node.id(), node.type_name(), runtime.scope().len());
        let state = self.states.entry(idx).or_default();
        let result = {
            let mut ctx = ActionContext::new(action_runtime, state, preceding);
            action.exec(&mut ctx).await
        };
        runtime.introspection().record(|| entry.finish(started, &result));
        result?;

        let state = self.states.entry(idx).or_default();
        if kind.has_children() && state.bypassed.is_none() {
            state.bypassed = Some(false);
        }
        let bypassed = state.bypassed.unwrap_or(false);

        let transition = after_run(tree, self.context, &path, kind, bypassed);
        debug!(action = node.id(), bypassed, transition = ?transition, "Action done");
        self.apply(tree, idx, action.as_ref(), &transition);
        Ok(transition)
    }

    fn apply(&mut self, tree: &ActionTree, idx: usize, action: &dyn Action, transition: &Transition) {
        match transition {
            Transition::Enter(path) => {
                let inherited = self.locals.scope();
                let state = self.states.get(&idx).cloned().unwrap_or_default();
                self.locals.push(action.children_scope(&state, &inherited));
                self.arrive(tree, path);
            }
            Transition::Next(path) => {
                self.locals.truncate(path.len());
                self.arrive(tree, path);
            }
            Transition::Repeat(path) => {
                self.locals.truncate(path.len());
                if let Some(loop_idx) = tree.node_at(self.context, path) {
                    for d in tree.descendants(loop_idx) {
                        self.states.remove(&d);
                    }
                }
                self.path = Some(path.clone());
            }
            Transition::Finish => self.finish(),
        }
    }

    /// Fresh arrival at `path`: the action and its subtree start clean.
    fn arrive(&mut self, tree: &ActionTree, path: &[usize]) {
        if let Some(target) = tree.node_at(self.context, path) {
            self.reset_subtree(tree, target);
        }
        self.path = Some(path.to_vec());
    }

    fn reset_subtree(&mut self, tree: &ActionTree, idx: usize) {
        self.states.remove(&idx);
        for d in tree.descendants(idx) {
            self.states.remove(&d);
        }
    }
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback")
            .field("context", &self.context)
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
#[path = "playback_tests.rs"]
mod tests;
