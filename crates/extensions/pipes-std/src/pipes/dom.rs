//! Page queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipe::{Pipe, PipeDef};
use scriptflow_protocols::element::{Element, NodeRef};
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

use super::emit;

/// Nodes matching `selector` under each input node, or under the document
/// for empty input.
pub struct QueryAll {
    selector: String,
    optional: bool,
}

#[async_trait]
impl Pipe for QueryAll {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let page = ctx.page()?;
        let scopes = if input.is_empty() {
            vec![NodeRef::new_document()]
        } else {
            input.iter().map(|el| el.node().clone()).collect()
        };

        let mut out = Vec::new();
        for scope in &scopes {
            for node in page.query_all(scope, &self.selector).await? {
                out.push(Element::new(node, Value::Null));
            }
        }
        if out.is_empty() && !self.optional {
            return Err(EngineError::playback_code(
                "ElementNotFound",
                format!("No elements match {}", self.selector),
            )
            .with_details(json!({ "selector": self.selector })));
        }
        Ok(out)
    }
}

/// Text content of each node.
pub struct GetText;

#[async_trait]
impl Pipe for GetText {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let page = ctx.page()?;
        let mut out = Vec::with_capacity(input.len());
        for el in &input {
            let text = page.text_content(el.node()).await?;
            out.push(el.clone_with(Value::String(text)));
        }
        Ok(out)
    }
}

/// Current page URL.
pub struct GetUrl;

#[async_trait]
impl Pipe for GetUrl {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let url = ctx.page()?.url().await?;
        Ok(emit(&input, Value::String(url)))
    }
}

pub(super) fn defs() -> Vec<PipeDef> {
    vec![
        PipeDef::new(
            "Dom.queryAll",
            Schema::new()
                .param(ParamSpec::string("selector").required())
                .param(ParamSpec::boolean("optional")),
            |params| {
                Ok(Arc::new(QueryAll {
                    selector: params.str("selector")?.to_string(),
                    optional: params.bool("optional"),
                }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new("Dom.getText", Schema::new(), |_| Ok(Arc::new(GetText) as Arc<dyn Pipe>)),
        PipeDef::new("Page.getUrl", Schema::new(), |_| Ok(Arc::new(GetUrl) as Arc<dyn Pipe>)),
    ]
}

#[cfg(test)]
#[path = "dom_tests.rs"]
mod tests;
