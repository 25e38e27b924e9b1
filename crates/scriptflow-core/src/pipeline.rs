//! Pipelines: ordered pipe chains evaluated as a strict left-to-right fold.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;

use crate::context::{EntryKind, IntrospectionEntry, RuntimeCtx};
use crate::pipe::PipeNode;

/// Ordered sequence of pipes owned by one unit under a named param.
///
/// The output set of pipe *i* is the input set of pipe *i+1*; pipe *i+1*
/// never starts before pipe *i* has resolved for the whole set. The empty
/// pipeline is the identity.
#[derive(Clone, Default)]
pub struct Pipeline {
    pipes: Vec<Arc<PipeNode>>,
}

impl Pipeline {
    pub fn new(pipes: Vec<Arc<PipeNode>>) -> Self {
        Self { pipes }
    }

    pub fn pipes(&self) -> &[Arc<PipeNode>] {
        &self.pipes
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Run the whole pipeline. May return any number of elements.
    pub async fn select_all(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let started = Instant::now();
        let entry = IntrospectionEntry::start(
            EntryKind::Pipeline,
            ctx.action_id().unwrap_or_default(),
            "Pipeline",
            input.len(),
        );
        let result = self.fold(input, ctx).await;
        ctx.introspection().record(|| entry.finish(started, &result));
        result
    }

    async fn fold(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut set = input;
        for node in &self.pipes {
            set = node.apply(set, ctx).await?;
            debug!(pipe = node.type_name(), count = set.len(), "Pipe applied");
        }
        Ok(set)
    }

    /// Run the pipeline and require exactly one resulting element.
    pub async fn select_one(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Element, EngineError> {
        let mut elements = self.select_all(input, ctx).await?;
        if elements.len() != 1 {
            return Err(arity_error(elements.len(), "exactly one"));
        }
        Ok(elements.remove(0))
    }

    /// Like [`select_one`](Self::select_one), but zero results are accepted
    /// and give `None` when `optional` is set.
    pub async fn select_single(
        &self,
        input: Vec<Element>,
        optional: bool,
        ctx: &RuntimeCtx,
    ) -> Result<Option<Element>, EngineError> {
        if optional {
            self.select_one_or_null(input, ctx).await
        } else {
            self.select_one(input, ctx).await.map(Some)
        }
    }

    /// Zero or one element; more than one is always an error.
    pub async fn select_one_or_null(
        &self,
        input: Vec<Element>,
        ctx: &RuntimeCtx,
    ) -> Result<Option<Element>, EngineError> {
        let mut elements = self.select_all(input, ctx).await?;
        match elements.len() {
            0 => Ok(None),
            1 => Ok(Some(elements.remove(0))),
            n => Err(arity_error(n, "at most one")),
        }
    }

    /// Spec form: an array of pipe specs.
    pub fn to_spec(&self) -> Value {
        Value::Array(self.pipes.iter().map(|p| p.to_spec()).collect())
    }

    /// All pipes of this pipeline and of the pipelines nested in their
    /// params, depth-first.
    pub fn descendant_pipes(&self) -> Vec<Arc<PipeNode>> {
        let mut out = Vec::new();
        for node in &self.pipes {
            out.push(node.clone());
            for nested in node.params().pipelines() {
                out.extend(nested.descendant_pipes());
            }
        }
        out
    }
}

fn arity_error(found: usize, expected: &str) -> EngineError {
    EngineError::playback(format!("Expected {} element, found {}", expected, found))
        .with_details(serde_json::json!({ "found": found }))
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.pipes.iter().map(|p| p.type_name()))
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
