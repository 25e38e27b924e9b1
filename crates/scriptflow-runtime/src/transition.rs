//! Pure playhead transitions over the action tree.

use scriptflow_core::action::ActionKind;

use crate::tree::ActionTree;

/// Where the playhead goes after an action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Into the first child of the action just run.
    Enter(Vec<usize>),
    /// To the next action at the same or a shallower level.
    Next(Vec<usize>),
    /// Back to a loop action whose children are exhausted.
    Repeat(Vec<usize>),
    /// Off the end of the context.
    Finish,
}

impl Transition {
    pub fn path(&self) -> Option<&[usize]> {
        match self {
            Transition::Enter(p) | Transition::Next(p) | Transition::Repeat(p) => Some(p),
            Transition::Finish => None,
        }
    }
}

/// Transition after the action at `path` ran with the given bypass flag.
pub fn after_run(tree: &ActionTree, context: usize, path: &[usize], kind: ActionKind, bypassed: bool) -> Transition {
    if kind.has_children() && !bypassed {
        if tree.child_count(context, path) > 0 {
            let mut child = path.to_vec();
            child.push(0);
            return Transition::Enter(child);
        }
        if kind == ActionKind::Loop {
            return Transition::Repeat(path.to_vec());
        }
    }
    leave(tree, context, path)
}

/// Move past the action at `path`: next sibling, else pop to the parent.
/// A loop parent gets the playhead back; any other parent is left in turn.
pub fn leave(tree: &ActionTree, context: usize, path: &[usize]) -> Transition {
    let Some((last, parent)) = path.split_last() else {
        return Transition::Finish;
    };
    if last + 1 < tree.child_count(context, parent) {
        let mut next = parent.to_vec();
        next.push(last + 1);
        return Transition::Next(next);
    }
    if parent.is_empty() {
        return Transition::Finish;
    }
    match tree.node_at(context, parent) {
        Some(idx) if tree.node(idx).kind() == ActionKind::Loop => Transition::Repeat(parent.to_vec()),
        _ => leave(tree, context, parent),
    }
}
