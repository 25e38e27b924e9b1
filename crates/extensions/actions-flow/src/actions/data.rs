//! Actions moving data in and out of the script: globals, locals, script
//! I/O and page navigation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use scriptflow_core::action::{Action, ActionContext, ActionDef};
use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipeline::Pipeline;
use scriptflow_core::retry::{retry, RetryOptions};
use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

/// Run `pipeline` on the action scope with retries.
async fn select(pipeline: &Pipeline, scope: Vec<Element>, runtime: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
    retry(runtime, RetryOptions::default(), || {
        let input = scope.clone();
        async move { pipeline.select_all(input, runtime).await }
    })
    .await
}

/// Stores the single selected value under a global key; selecting nothing
/// stores null.
pub struct SetGlobal {
    key: String,
    pipeline: Pipeline,
}

#[async_trait]
impl Action for SetGlobal {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let scope = ctx.scope();
        let runtime = &ctx.runtime;
        let pipeline = &self.pipeline;
        let selected = retry(runtime, RetryOptions::default(), || {
            let input = scope.clone();
            async move { pipeline.select_one_or_null(input, runtime).await }
        })
        .await?;
        let value = selected.map(Element::into_value).unwrap_or(Value::Null);
        debug!(key = %self.key, "Global set");
        runtime.globals().set(&self.key, value);
        Ok(())
    }
}

/// Appends every selected value to the array under a global key.
pub struct AppendGlobal {
    key: String,
    pipeline: Pipeline,
}

#[async_trait]
impl Action for AppendGlobal {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let elements = select(&self.pipeline, ctx.scope(), &ctx.runtime).await?;
        let globals = ctx.runtime.globals();
        for element in elements {
            globals.append(&self.key, element.into_value());
        }
        Ok(())
    }
}

/// Binds the selected elements to a local visible to later siblings and
/// their descendants.
pub struct SetLocal {
    key: String,
    pipeline: Pipeline,
}

#[async_trait]
impl Action for SetLocal {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let elements = select(&self.pipeline, ctx.scope(), &ctx.runtime).await?;
        debug!(key = %self.key, count = elements.len(), "Local set");
        ctx.runtime.set_local(&self.key, elements);
        Ok(())
    }
}

/// Emits the single selected value as a script output.
pub struct SendOutput {
    key: String,
    pipeline: Pipeline,
}

#[async_trait]
impl Action for SendOutput {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let scope = ctx.scope();
        let runtime = &ctx.runtime;
        let pipeline = &self.pipeline;
        let element = retry(runtime, RetryOptions::default(), || {
            let input = scope.clone();
            async move { pipeline.select_one(input, runtime).await }
        })
        .await?;
        runtime.io().send_output(&self.key, element.into_value()).await
    }
}

/// Forgets a consumed input so the next request asks for it again.
pub struct ResetInput {
    key: String,
}

#[async_trait]
impl Action for ResetInput {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        ctx.runtime.io().reset_input(&self.key);
        Ok(())
    }
}

pub struct Navigate {
    url: String,
}

#[async_trait]
impl Action for Navigate {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let runtime = &ctx.runtime;
        let url = self.url.as_str();
        info!(url, "Navigating");
        retry(runtime, RetryOptions::default(), || async move {
            runtime.page()?.navigate(url).await
        })
        .await
    }
}

fn keyed_schema() -> Schema {
    Schema::new()
        .param(ParamSpec::string("key").required())
        .param(ParamSpec::pipeline("pipeline"))
}

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef::new("Global.setGlobal", keyed_schema(), |params| {
            Ok(Arc::new(SetGlobal {
                key: params.str("key")?.to_string(),
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Action>)
        }),
        ActionDef::new("Global.appendGlobal", keyed_schema(), |params| {
            Ok(Arc::new(AppendGlobal {
                key: params.str("key")?.to_string(),
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Action>)
        }),
        ActionDef::new("Local.setLocal", keyed_schema(), |params| {
            Ok(Arc::new(SetLocal {
                key: params.str("key")?.to_string(),
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Action>)
        }),
        ActionDef::new("Data.sendOutput", keyed_schema(), |params| {
            Ok(Arc::new(SendOutput {
                key: params.str("key")?.to_string(),
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Action>)
        }),
        ActionDef::new(
            "Data.resetInput",
            Schema::new().param(ParamSpec::string("key").required()),
            |params| {
                Ok(Arc::new(ResetInput {
                    key: params.str("key")?.to_string(),
                }) as Arc<dyn Action>)
            },
        ),
        ActionDef::new(
            "Page.navigate",
            Schema::new().param(ParamSpec::string("url").required()),
            |params| {
                Ok(Arc::new(Navigate {
                    url: params.str("url")?.to_string(),
                }) as Arc<dyn Action>)
            },
        ),
    ]
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
