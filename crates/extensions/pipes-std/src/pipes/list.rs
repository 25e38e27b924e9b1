//! List expansion, filtering, folds and windows.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipe::{Pipe, PipeDef};
use scriptflow_core::pipeline::Pipeline;
use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

/// Evaluate a predicate pipeline on one element. It must yield exactly one
/// boolean.
async fn holds(predicate: &Pipeline, element: &Element, ctx: &RuntimeCtx) -> Result<bool, EngineError> {
    predicate.select_one(vec![element.clone()], ctx).await?.as_bool()
}

/// One element per array item, keeping the array's node.
pub struct FromArray {
    optional: bool,
}

#[async_trait]
impl Pipe for FromArray {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut out = Vec::new();
        for el in &input {
            match el.value() {
                Value::Array(items) => out.extend(items.iter().map(|item| el.clone_with(item.clone()))),
                _ if self.optional => {}
                other => return Err(EngineError::value_type("array", other)),
            }
        }
        Ok(out)
    }
}

/// Keeps the elements the predicate holds for, in order.
pub struct Filter {
    pipeline: Pipeline,
}

#[async_trait]
impl Pipe for Filter {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut out = Vec::with_capacity(input.len());
        for el in input {
            if holds(&self.pipeline, &el, ctx).await? {
                out.push(el);
            }
        }
        Ok(out)
    }
}

pub struct Every {
    pipeline: Pipeline,
}

#[async_trait]
impl Pipe for Every {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut result = true;
        for el in &input {
            if !holds(&self.pipeline, el, ctx).await? {
                result = false;
                break;
            }
        }
        Ok(vec![Element::document(Value::Bool(result))])
    }
}

pub struct Any {
    pipeline: Pipeline,
}

#[async_trait]
impl Pipe for Any {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut result = false;
        for el in &input {
            if holds(&self.pipeline, el, ctx).await? {
                result = true;
                break;
            }
        }
        Ok(vec![Element::document(Value::Bool(result))])
    }
}

/// Number of elements the predicate holds for.
pub struct CountBy {
    pipeline: Pipeline,
}

#[async_trait]
impl Pipe for CountBy {
    async fn apply(&self, input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut count = 0u64;
        for el in &input {
            if holds(&self.pipeline, el, ctx).await? {
                count += 1;
            }
        }
        Ok(vec![Element::document(json!(count))])
    }
}

/// Each element `times` times in a row.
pub struct Repeat {
    times: usize,
}

#[async_trait]
impl Pipe for Repeat {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        Ok(input
            .iter()
            .flat_map(|el| std::iter::repeat_n(el.clone(), self.times))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("rtl") => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }
}

/// Length of the run of elements, scanned from `direction`, that the
/// predicate holds for.
async fn run_length(
    predicate: &Pipeline,
    input: &[Element],
    direction: Direction,
    ctx: &RuntimeCtx,
) -> Result<usize, EngineError> {
    let mut n = 0;
    for i in 0..input.len() {
        let el = match direction {
            Direction::Ltr => &input[i],
            Direction::Rtl => &input[input.len() - 1 - i],
        };
        if !holds(predicate, el, ctx).await? {
            break;
        }
        n += 1;
    }
    Ok(n)
}

/// The leading (or trailing) run the predicate holds for.
pub struct TakeWhile {
    pipeline: Pipeline,
    direction: Direction,
}

#[async_trait]
impl Pipe for TakeWhile {
    async fn apply(&self, mut input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let n = run_length(&self.pipeline, &input, self.direction, ctx).await?;
        Ok(match self.direction {
            Direction::Ltr => {
                input.truncate(n);
                input
            }
            Direction::Rtl => input.split_off(input.len() - n),
        })
    }
}

/// Everything but the leading (or trailing) run the predicate holds for.
pub struct SkipWhile {
    pipeline: Pipeline,
    direction: Direction,
}

#[async_trait]
impl Pipe for SkipWhile {
    async fn apply(&self, mut input: Vec<Element>, ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let n = run_length(&self.pipeline, &input, self.direction, ctx).await?;
        Ok(match self.direction {
            Direction::Ltr => input.split_off(n),
            Direction::Rtl => {
                input.truncate(input.len() - n);
                input
            }
        })
    }
}

fn predicate_schema() -> Schema {
    Schema::new().param(ParamSpec::pipeline("pipeline"))
}

fn window_schema() -> Schema {
    Schema::new()
        .param(ParamSpec::enumeration("direction", &["ltr", "rtl"]).with_default(json!("ltr")))
        .extend(&predicate_schema())
}

pub(super) fn defs() -> Vec<PipeDef> {
    vec![
        PipeDef::new(
            "List.fromArray",
            Schema::new().param(ParamSpec::boolean("optional")),
            |params| {
                Ok(Arc::new(FromArray {
                    optional: params.bool("optional"),
                }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new("List.filter", predicate_schema(), |params| {
            Ok(Arc::new(Filter {
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Pipe>)
        }),
        PipeDef::new("List.every", predicate_schema(), |params| {
            Ok(Arc::new(Every {
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Pipe>)
        }),
        PipeDef::new("List.some", predicate_schema(), |params| {
            Ok(Arc::new(Any {
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Pipe>)
        }),
        PipeDef::new("List.countBy", predicate_schema(), |params| {
            Ok(Arc::new(CountBy {
                pipeline: params.pipeline("pipeline"),
            }) as Arc<dyn Pipe>)
        }),
        PipeDef::new(
            "List.repeat",
            Schema::new().param(ParamSpec::number("times").with_default(json!(1))),
            |params| {
                let times = params.number("times")?;
                if times < 0.0 || times.fract() != 0.0 {
                    return Err(EngineError::invalid_script(
                        "List.repeat: times must be a non-negative integer",
                    )
                    .with_details(json!({ "times": times })));
                }
                Ok(Arc::new(Repeat { times: times as usize }) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new("List.takeWhile", window_schema(), |params| {
            Ok(Arc::new(TakeWhile {
                pipeline: params.pipeline("pipeline"),
                direction: Direction::parse(params.opt_str("direction")),
            }) as Arc<dyn Pipe>)
        }),
        PipeDef::new("List.skipWhile", window_schema(), |params| {
            Ok(Arc::new(SkipWhile {
                pipeline: params.pipeline("pipeline"),
                direction: Direction::parse(params.opt_str("direction")),
            }) as Arc<dyn Pipe>)
        }),
    ]
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
