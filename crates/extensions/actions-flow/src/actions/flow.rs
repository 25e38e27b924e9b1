//! Branching, grouping and scripted failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use scriptflow_core::action::{Action, ActionContext, ActionDef, ActionKind};
use scriptflow_core::pipeline::Pipeline;
use scriptflow_core::retry::{retry, RetryOptions};
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

use super::condition;

const IF: &str = "Flow.if";
const ELSE_IF: &str = "Flow.elseIf";

/// Whether a member of the chain ending right before this action was
/// entered. Fails if the chain is broken or a member has not run yet.
fn chain_entered(ctx: &ActionContext<'_>, type_name: &str) -> Result<bool, EngineError> {
    let mut entered = false;
    for sibling in ctx.preceding_siblings() {
        if sibling.type_name != IF && sibling.type_name != ELSE_IF {
            return Err(EngineError::invalid_script(format!(
                "{} must follow {} or {}",
                type_name, IF, ELSE_IF
            ))
            .with_details(json!({ "previous": sibling.id })));
        }
        match sibling.bypassed {
            None => {
                return Err(EngineError::invalid_script(format!(
                    "{}: {} has not run yet",
                    type_name, sibling.id
                ))
                .with_details(json!({ "previous": sibling.id })));
            }
            Some(false) => entered = true,
            Some(true) => {}
        }
        if sibling.type_name == IF {
            return Ok(entered);
        }
    }
    Err(EngineError::invalid_script(format!("{} without a preceding {}", type_name, IF)))
}

/// Enters its children when the condition holds.
pub struct If {
    pipeline: Pipeline,
}

#[async_trait]
impl Action for If {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let scope = ctx.scope();
        let holds = condition(&self.pipeline, &scope, &ctx.runtime, RetryOptions::default()).await?;
        ctx.set_bypassed(!holds);
        Ok(())
    }
}

/// Enters its children when no earlier member of the chain was entered and
/// the condition holds.
pub struct ElseIf {
    pipeline: Pipeline,
}

#[async_trait]
impl Action for ElseIf {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        if chain_entered(ctx, ELSE_IF)? {
            ctx.set_bypassed(true);
            return Ok(());
        }
        let scope = ctx.scope();
        let holds = condition(&self.pipeline, &scope, &ctx.runtime, RetryOptions::default()).await?;
        ctx.set_bypassed(!holds);
        Ok(())
    }
}

/// Enters its children when no earlier member of the chain was entered.
pub struct Else;

#[async_trait]
impl Action for Else {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let entered = chain_entered(ctx, "Flow.else")?;
        ctx.set_bypassed(entered);
        Ok(())
    }
}

/// Always enters its children.
pub struct Group;

#[async_trait]
impl Action for Group {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        ctx.set_bypassed(false);
        Ok(())
    }
}

/// Scopes its children to the single element its pipeline selects. An
/// optional find that selects nothing skips the children.
pub struct Find {
    pipeline: Pipeline,
    optional: bool,
}

#[async_trait]
impl Action for Find {
    fn kind(&self) -> ActionKind {
        ActionKind::Block
    }

    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let scope = ctx.scope();
        let pipeline = &self.pipeline;
        let runtime = &ctx.runtime;
        let optional = self.optional;
        let found = retry(runtime, RetryOptions::default(), || {
            let input = scope.clone();
            async move { pipeline.select_single(input, optional, runtime).await }
        })
        .await?;

        match found {
            Some(element) => {
                debug!(element = element.description(), "Found");
                ctx.state.scope = Some(vec![element]);
                ctx.set_bypassed(false);
            }
            None => ctx.set_bypassed(true),
        }
        Ok(())
    }
}

/// Raises a scripted, non-retriable error.
pub struct Fail {
    code: String,
    message: String,
    website_message: Option<String>,
}

#[async_trait]
impl Action for Fail {
    async fn exec(&self, _ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let mut error = EngineError::scripted(&self.code, &self.message);
        if let Some(message) = &self.website_message {
            error = error.with_website_message(message);
        }
        Err(error)
    }
}

/// Waits for the condition to hold, raising a scripted error when it does
/// not within the timeout.
pub struct Expect {
    pipeline: Pipeline,
    code: String,
    message: String,
    timeout: Option<Duration>,
}

#[async_trait]
impl Action for Expect {
    async fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
        let options = self.timeout.map(RetryOptions::fixed).unwrap_or_default();
        let scope = ctx.scope();
        let pipeline = &self.pipeline;
        let runtime = &ctx.runtime;
        retry(runtime, options, || {
            let input = scope.clone();
            async move {
                let holds = pipeline.select_one(input, runtime).await?.as_bool()?;
                if holds {
                    Ok(())
                } else {
                    Err(EngineError::scripted(&self.code, &self.message).with_retry(true))
                }
            }
        })
        .await
    }
}

fn condition_schema() -> Schema {
    Schema::new().param(ParamSpec::pipeline("pipeline").required())
}

fn error_schema(default_code: &str) -> Schema {
    Schema::new()
        .param(ParamSpec::string("errorCode").with_default(json!(default_code)))
        .param(ParamSpec::string("message"))
}

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef::new(IF, condition_schema(), |params| {
            Ok(Arc::new(If {
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Action>)
        }),
        ActionDef::new(ELSE_IF, condition_schema(), |params| {
            Ok(Arc::new(ElseIf {
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Action>)
        }),
        ActionDef::new("Flow.else", Schema::new(), |_| Ok(Arc::new(Else) as Arc<dyn Action>)),
        ActionDef::new("Flow.group", Schema::new(), |_| Ok(Arc::new(Group) as Arc<dyn Action>)),
        ActionDef::new(
            "Flow.find",
            condition_schema().param(ParamSpec::boolean("optional")),
            |params| {
                Ok(Arc::new(Find {
                    pipeline: params.pipeline("pipeline"),
                    optional: params.bool("optional"),
                }) as Arc<dyn Action>)
            },
        ),
        ActionDef::new(
            "Flow.fail",
            error_schema("ScriptFailed").param(ParamSpec::string("websiteMessage")),
            |params| {
                Ok(Arc::new(Fail {
                    code: params.str("errorCode")?.to_string(),
                    message: params.opt_str("message").unwrap_or("Script failed").to_string(),
                    website_message: params.opt_str("websiteMessage").map(str::to_string),
                }) as Arc<dyn Action>)
            },
        ),
        ActionDef::new(
            "Flow.expect",
            error_schema("ExpectationFailed")
                .extend(&condition_schema())
                .param(ParamSpec::number("timeout").with_label("Timeout (ms)")),
            |params| {
                let timeout = match params.opt_number("timeout") {
                    Some(ms) if ms < 0.0 => {
                        return Err(EngineError::invalid_script("Flow.expect: timeout must not be negative")
                            .with_details(json!({ "timeout": ms })));
                    }
                    Some(ms) => Some(Duration::from_millis(ms as u64)),
                    None => None,
                };
                Ok(Arc::new(Expect {
                    pipeline: params.pipeline("pipeline"),
                    code: params.str("errorCode")?.to_string(),
                    message: params.opt_str("message").unwrap_or("Expectation failed").to_string(),
                    timeout,
                }) as Arc<dyn Action>)
            },
        ),
    ]
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
