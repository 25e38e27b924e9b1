//! Looping actions. Both re-run `exec` each time their children finish.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use scriptflow_core::action::{Action, ActionContext, ActionDef, ActionKind};
use scriptflow_core::pipeline::Pipeline;
use scriptflow_core::retry::{retry, RetryOptions};
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

use super::condition;

const DEFAULT_WHILE_LIMIT: u32 = 100;

/// Runs its children once per element of its pipeline, with that element
/// as their scope.
///
/// The list is selected again on every pass, so elements added or removed
/// by the children are seen by later iterations.
pub struct Each {
    pipeline: Pipeline,
}

#[async_trait]
impl Action for Each {
    fn kind(&self) -> ActionKind {
        ActionKind::Loop
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let index = ctx.state.iteration.map(|i| i + 1).unwrap_or(0);
        let scope = ctx.scope();
        let pipeline = &self.pipeline;
        let runtime = &ctx.runtime;
        let mut items = retry(runtime, RetryOptions::default(), || {
            let input = scope.clone();
            async move { pipeline.select_all(input, runtime).await }
        })
        .await?;
        // Advance only after the select; an interrupted pass retries this index.
        ctx.state.iteration = Some(index);

        if index >= items.len() {
            debug!(iterations = index, "Each done");
            ctx.state.scope = None;
            ctx.set_bypassed(true);
            return Ok(());
        }
        debug!(index, total = items.len(), "Each iteration");
        ctx.state.scope = Some(vec![items.swap_remove(index)]);
        ctx.set_bypassed(false);
        Ok(())
    }
}

/// Runs its children while the condition holds, failing once it has been
/// checked more than `limit + 1` times. Only completed checks count.
pub struct While {
    pipeline: Pipeline,
    limit: u32,
}

#[async_trait]
impl Action for While {
    fn kind(&self) -> ActionKind {
        ActionKind::Loop
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if ctx.state.attempts > self.limit {
            return Err(EngineError::playback(format!("Loop limit of {} exceeded", self.limit))
                .with_retry(false)
                .with_details(json!({ "limit": self.limit })));
        }
        let scope = ctx.scope();
        let holds = condition(&self.pipeline, &scope, &ctx.runtime, RetryOptions::default()).await?;
        ctx.state.attempts += 1;
        debug!(attempt = ctx.state.attempts, holds, "While condition");
        ctx.set_bypassed(!holds);
        Ok(())
    }
}

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef::new(
            "Flow.each",
            Schema::new().param(ParamSpec::pipeline("pipeline").required()),
            |params| {
                Ok(Arc::new(Each {
                    pipeline: params.pipeline("pipeline"),
                }) as Arc<dyn Action>)
            },
        ),
        ActionDef::new(
            "Flow.while",
            Schema::new()
                .param(ParamSpec::pipeline("pipeline").required())
                .param(ParamSpec::number("limit").with_default(json!(DEFAULT_WHILE_LIMIT))),
            |params| {
                let limit = params.number("limit")?;
                if limit < 0.0 || limit.fract() != 0.0 {
                    return Err(EngineError::invalid_script("Flow.while: limit must be a non-negative integer")
                        .with_details(json!({ "limit": limit })));
                }
                Ok(Arc::new(While {
                    pipeline: params.pipeline("pipeline"),
                    limit: limit as u32,
                }) as Arc<dyn Action>)
            },
        ),
    ]
}

#[cfg(test)]
#[path = "loops_tests.rs"]
mod tests;
