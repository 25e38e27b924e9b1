use super::*;
use async_trait::async_trait;
use serde_json::json;

use crate::context::Definition;
use crate::pipe::{Pipe, PipeNode};
use crate::pipeline::Pipeline;
use crate::unit::Params;

struct Repeat;

#[async_trait]
impl Pipe for Repeat {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Ok(input
            .iter()
            .flat_map(|el| vec![el.clone(), el.clone()])
            .collect())
    }
}

fn repeat_pipeline() -> Pipeline {
    Pipeline::new(vec![Arc::new(PipeNode::new(
        "p1",
        "Test.repeat",
        Params::new("Test.repeat"),
        Arc::new(Repeat),
    ))])
}

#[test]
fn test_new_context_defaults() {
    let ctx = RuntimeCtx::new("script-1");
    assert_eq!(ctx.script_id(), "script-1");
    assert_eq!(ctx.context_name(), "main");
    assert!(ctx.action_id().is_none());
    assert!(ctx.scope().is_empty());
    assert!(ctx.tick().is_ok());
}

#[test]
fn test_for_action_shares_services() {
    let ctx = RuntimeCtx::new("script-1");
    let action_ctx = ctx.for_action("a1");
    assert_eq!(action_ctx.action_id(), Some("a1"));
    action_ctx.globals().set("x", json!(1));
    assert_eq!(ctx.globals().get("x"), Some(json!(1)));
}

#[test]
fn test_tick_after_cancel() {
    let ctx = RuntimeCtx::new("script-1");
    ctx.cancel_token().cancel();
    let err = ctx.tick().unwrap_err();
    assert_eq!(err.code(), "PlaybackInterrupted");
    assert!(!err.is_retriable());
}

#[test]
fn test_get_undefined_local_fails() {
    let ctx = RuntimeCtx::new("script-1");
    let err = ctx.get_local("missing").unwrap_err();
    assert_eq!(err.code(), "InvalidScript");
    assert_eq!(err.details()["key"], json!("missing"));
}

#[test]
fn test_set_and_get_local() {
    let ctx = RuntimeCtx::new("script-1");
    ctx.set_local("item", vec![Element::document(json!("a"))]);
    let local = ctx.get_local("item").unwrap();
    assert_eq!(local[0].value(), &json!("a"));
    assert_eq!(ctx.all_locals().len(), 1);
}

#[tokio::test]
async fn test_eval_definition_per_element() {
    let ctx = RuntimeCtx::new("script-1");
    ctx.definitions().insert(Definition {
        id: "twice".to_string(),
        label: None,
        pipeline: repeat_pipeline(),
    });

    let input = vec![Element::document(json!(1)), Element::document(json!(2))];
    let out = ctx.eval_definition("twice", input).await.unwrap();
    let values: Vec<_> = out.iter().map(|e| e.value().clone()).collect();
    assert_eq!(values, vec![json!(1), json!(1), json!(2), json!(2)]);
}

#[tokio::test]
async fn test_eval_unknown_definition() {
    let ctx = RuntimeCtx::new("script-1");
    let err = ctx.eval_definition("nope", Vec::new()).await.unwrap_err();
    assert_eq!(err.code(), "InvalidScript");
}
