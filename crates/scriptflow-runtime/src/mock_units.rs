//! Minimal action and pipe types for exercising the tree walker in unit
//! tests.
//!
//! Every mock action appends its id to the `trace` global when it executes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scriptflow_core::action::{Action, ActionContext, ActionDef, ActionKind, RunState};
use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipe::{Pipe, PipeDef};
use scriptflow_core::registry::Resolver;
use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

struct Mark {
    fail: Option<String>,
}

#[async_trait]
impl Action for Mark {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        trace(ctx);
        let scope: Vec<Value> = ctx.scope().into_iter().map(Element::into_value).collect();
        ctx.runtime.globals().append("scopes", Value::Array(scope));
        match self.fail.as_deref() {
            Some("playback") => Err(EngineError::playback("mock failure").with_retry(false)),
            Some("interrupt") => {
                ctx.runtime.cancel_token().cancel();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

struct Block {
    enter: bool,
}

#[async_trait]
impl Action for Block {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        trace(ctx);
        ctx.set_bypassed(!self.enter);
        Ok(())
    }
}

/// Loops `times` times, scoping each pass to its iteration index.
struct Repeat {
    times: usize,
}

#[async_trait]
impl Action for Repeat {
    fn kind(&self) -> ActionKind {
        ActionKind::Loop
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        trace(ctx);
        let next = ctx.state.iteration.map(|i| i + 1).unwrap_or(0);
        ctx.state.iteration = Some(next);
        if next >= self.times {
            ctx.set_bypassed(true);
        } else {
            ctx.state.scope = Some(vec![Element::document(json!(next))]);
            ctx.set_bypassed(false);
        }
        Ok(())
    }

    fn children_scope(&self, state: &RunState, inherited: &[Element]) -> Vec<Element> {
        state.scope.clone().unwrap_or_else(|| inherited.to_vec())
    }
}

/// Emits `value` once per input element, or once on empty input.
struct Const {
    value: Value,
}

#[async_trait]
impl Pipe for Const {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        if input.is_empty() {
            return Ok(vec![Element::document(self.value.clone())]);
        }
        Ok(input.iter().map(|el| el.clone_with(self.value.clone())).collect())
    }
}

fn trace(ctx: &ActionContext<'_>) {
    let id = ctx.runtime.action_id().unwrap_or_default().to_string();
    ctx.runtime.globals().append("trace", Value::String(id));
}

/// `trace` global as a list of action ids.
pub(crate) fn traced(globals: &scriptflow_core::context::Globals) -> Vec<String> {
    match globals.get("trace") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// A resolver with the `Test.mark`, `Test.block` and `Test.repeat` actions
/// and the `Test.const` pipe registered.
pub(crate) fn resolver() -> Resolver {
    let resolver = Resolver::new();
    let defs = [
        ActionDef::new(
            "Test.mark",
            Schema::new().param(ParamSpec::string("fail")),
            |params| {
                Ok(Arc::new(Mark {
                    fail: params.opt_str("fail").map(str::to_string),
                }) as Arc<dyn Action>)
            },
        ),
        ActionDef::new(
            "Test.block",
            Schema::new().param(ParamSpec::boolean("enter").with_default(json!(true))),
            |params| Ok(Arc::new(Block { enter: params.bool("enter") }) as Arc<dyn Action>),
        ),
        ActionDef::new(
            "Test.repeat",
            Schema::new().param(ParamSpec::number("times").with_default(json!(2))),
            |params| {
                Ok(Arc::new(Repeat {
                    times: params.number("times")? as usize,
                }) as Arc<dyn Action>)
            },
        ),
    ];
    for def in defs {
        resolver
            .register_action(Arc::new(def))
            .expect("mock action registers once");
    }
    resolver
        .register_pipe(Arc::new(PipeDef::new(
            "Test.const",
            Schema::new().param(ParamSpec::json("value")),
            |params| {
                Ok(Arc::new(Const {
                    value: params.json("value"),
                }) as Arc<dyn Pipe>)
            },
        )))
        .expect("mock pipe registers once");
    resolver
}
