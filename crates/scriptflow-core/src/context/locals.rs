//! Stack of scope frames with named local bindings.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use scriptflow_protocols::element::Element;

/// One frame: the element scope children see plus the locals defined in it.
#[derive(Debug, Clone, Default)]
pub struct StackFrame {
    pub scope: Vec<Element>,
    pub locals: HashMap<String, Vec<Element>>,
}

impl StackFrame {
    pub fn new(scope: Vec<Element>) -> Self {
        Self {
            scope,
            locals: HashMap::new(),
        }
    }
}

/// Shared frame stack. Clones refer to the same stack.
///
/// Always holds at least the root frame.
#[derive(Debug, Clone)]
pub struct LocalsStack {
    frames: Arc<RwLock<Vec<StackFrame>>>,
}

impl Default for LocalsStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalsStack {
    pub fn new() -> Self {
        Self {
            frames: Arc::new(RwLock::new(vec![StackFrame::default()])),
        }
    }

    pub fn push(&self, scope: Vec<Element>) {
        self.frames.write().push(StackFrame::new(scope));
    }

    /// Pop the innermost frame. The root frame is never popped.
    pub fn pop(&self) -> Option<StackFrame> {
        let mut frames = self.frames.write();
        if frames.len() > 1 { frames.pop() } else { None }
    }

    /// Drop frames until `depth` remain (at least one).
    pub fn truncate(&self, depth: usize) {
        self.frames.write().truncate(depth.max(1));
    }

    pub fn depth(&self) -> usize {
        self.frames.read().len()
    }

    /// Back to a single empty root frame.
    pub fn reset(&self) {
        let mut frames = self.frames.write();
        frames.clear();
        frames.push(StackFrame::default());
    }

    /// Scope of the innermost frame.
    pub fn scope(&self) -> Vec<Element> {
        self.frames
            .read()
            .last()
            .map(|f| f.scope.clone())
            .unwrap_or_default()
    }

    /// Bind `key` in the innermost frame.
    pub fn set(&self, key: impl Into<String>, elements: Vec<Element>) {
        if let Some(frame) = self.frames.write().last_mut() {
            frame.locals.insert(key.into(), elements);
        }
    }

    /// Look `key` up, innermost frame first.
    pub fn get(&self, key: &str) -> Option<Vec<Element>> {
        self.frames
            .read()
            .iter()
            .rev()
            .find_map(|f| f.locals.get(key).cloned())
    }

    /// Visible bindings, innermost first. Shadowed bindings are skipped.
    pub fn all(&self) -> Vec<(String, Vec<Element>)> {
        let frames = self.frames.read();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for frame in frames.iter().rev() {
            let mut names: Vec<&String> = frame.locals.keys().collect();
            names.sort();
            for name in names {
                if seen.insert(name.clone()) {
                    out.push((name.clone(), frame.locals[name].clone()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn el(v: serde_json::Value) -> Vec<Element> {
        vec![Element::document(v)]
    }

    #[test]
    fn test_root_frame_is_kept() {
        let stack = LocalsStack::new();
        assert_eq!(stack.depth(), 1);
        assert!(stack.pop().is_none());
        stack.truncate(0);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_innermost_first_lookup() {
        let stack = LocalsStack::new();
        stack.set("x", el(json!(1)));
        stack.push(Vec::new());
        assert_eq!(stack.get("x").unwrap()[0].value(), &json!(1));
        stack.set("x", el(json!(2)));
        assert_eq!(stack.get("x").unwrap()[0].value(), &json!(2));
        stack.pop();
        assert_eq!(stack.get("x").unwrap()[0].value(), &json!(1));
    }

    #[test]
    fn test_all_skips_shadowed() {
        let stack = LocalsStack::new();
        stack.set("a", el(json!("outer")));
        stack.set("b", el(json!("b")));
        stack.push(Vec::new());
        stack.set("a", el(json!("inner")));

        let all = stack.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, "a");
        assert_eq!(all[0].1[0].value(), &json!("inner"));
        assert_eq!(all[1].0, "b");
    }

    #[test]
    fn test_scope_of_innermost_frame() {
        let stack = LocalsStack::new();
        assert!(stack.scope().is_empty());
        stack.push(el(json!("item")));
        assert_eq!(stack.scope()[0].value(), &json!("item"));
        stack.reset();
        assert!(stack.scope().is_empty());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_clones_share_frames() {
        let stack = LocalsStack::new();
        let other = stack.clone();
        other.push(Vec::new());
        assert_eq!(stack.depth(), 2);
    }
}
