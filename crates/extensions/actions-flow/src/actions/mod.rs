//! Action catalog.

mod data;
mod flow;
mod loops;

use scriptflow_core::action::ActionDef;
use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipeline::Pipeline;
use scriptflow_core::retry::{retry, RetryOptions};
use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;

pub use data::{AppendGlobal, Navigate, ResetInput, SendOutput, SetGlobal, SetLocal};
pub use flow::{Else, ElseIf, Expect, Fail, Find, Group, If};
pub use loops::{Each, While};

/// Every action type this crate provides.
pub fn catalog() -> Vec<ActionDef> {
    let mut defs = flow::defs();
    defs.extend(loops::defs());
    defs.extend(data::defs());
    defs
}

/// Evaluate a boolean condition on `scope`, retrying retriable failures.
pub(crate) async fn condition(
    pipeline: &Pipeline,
    scope: &[Element],
    runtime: &RuntimeCtx,
    options: RetryOptions,
) -> Result<bool, EngineError> {
    retry(runtime, options, || async move {
        pipeline.select_one(scope.to_vec(), runtime).await?.as_bool()
    })
    .await
}
