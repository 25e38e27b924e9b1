//! Range and regexp mappings.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};

use scriptflow_core::context::RuntimeCtx;
use scriptflow_core::pipe::{Pipe, PipeDef};
use scriptflow_protocols::compare::coerce_str;
use scriptflow_protocols::element::Element;
use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::schema::{ParamSpec, Schema};

/// `[min, max)` with open ends when unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub value: Value,
}

impl Range {
    fn from_row(row: &Map<String, Value>) -> Result<Self, EngineError> {
        let bound = |key: &str| match row.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| {
                EngineError::invalid_script(format!("Value.mapRange: {} must be a number", key))
                    .with_details(json!({ "range": row }))
            }),
        };
        Ok(Self {
            min: bound("min")?,
            max: bound("max")?,
            value: row.get("value").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn contains(&self, n: f64) -> bool {
        self.min.is_none_or(|min| n >= min) && self.max.is_none_or(|max| n < max)
    }
}

/// Maps a number to the value of the range it falls in.
pub struct MapRange {
    ranges: Vec<Range>,
}

impl MapRange {
    /// Ranges are sorted by `min` and must not overlap.
    pub fn new(mut ranges: Vec<Range>) -> Result<Self, EngineError> {
        ranges.sort_by(|a, b| {
            let a = a.min.unwrap_or(f64::NEG_INFINITY);
            let b = b.min.unwrap_or(f64::NEG_INFINITY);
            a.total_cmp(&b)
        });
        for range in &ranges {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min >= max {
                    return Err(EngineError::invalid_script("Value.mapRange: empty range")
                        .with_details(json!({ "min": min, "max": max })));
                }
            }
        }
        for pair in ranges.windows(2) {
            let ok = match (pair[0].max, pair[1].min) {
                (Some(max), Some(min)) => min >= max,
                _ => false,
            };
            if !ok {
                return Err(EngineError::invalid_script("Value.mapRange: ranges overlap").with_details(json!({
                    "first": { "min": pair[0].min, "max": pair[0].max },
                    "second": { "min": pair[1].min, "max": pair[1].max },
                })));
            }
        }
        Ok(Self { ranges })
    }

    fn lookup(&self, n: f64) -> Option<(usize, &Range)> {
        self.ranges.iter().enumerate().find(|(_, r)| r.contains(n))
    }
}

fn as_number(value: &Value) -> Result<f64, EngineError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| EngineError::value_type("number", value))
}

#[async_trait]
impl Pipe for MapRange {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        input
            .iter()
            .map(|el| {
                let n = as_number(el.value())?;
                match self.lookup(n) {
                    Some((_, range)) if !range.value.is_null() => Ok(el.clone_with(range.value.clone())),
                    Some((index, _)) => Ok(el.clone_with(json!(index))),
                    None => Err(EngineError::playback_code(
                        "RangeNotMatched",
                        format!("No range matches {}", n),
                    )
                    .with_retry(false)
                    .with_details(json!({ "value": n }))),
                }
            })
            .collect()
    }
}

/// What to do when no regexp matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatch {
    Error,
    /// Drop the element.
    Discard,
    /// Pass the element through unchanged.
    Bypass,
}

impl NoMatch {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("discard") => NoMatch::Discard,
            Some("bypass") => NoMatch::Bypass,
            _ => NoMatch::Error,
        }
    }
}

struct Mapping {
    regexp: Regex,
    value: Value,
}

/// Maps a string through the single regexp it matches. String replacement
/// values may reference capture groups (`$1`, `${name}`).
pub struct MapRegexp {
    mappings: Vec<Mapping>,
    on_no_match: NoMatch,
}

impl MapRegexp {
    pub fn new(rows: &[Map<String, Value>], on_no_match: NoMatch) -> Result<Self, EngineError> {
        let mappings = rows
            .iter()
            .map(|row| {
                let pattern = row.get("regexp").and_then(Value::as_str).ok_or_else(|| {
                    EngineError::invalid_script("Value.mapRegexp: mapping is missing a regexp")
                        .with_details(json!({ "mapping": row }))
                })?;
                let regexp = Regex::new(pattern).map_err(|e| {
                    EngineError::invalid_script(format!("Value.mapRegexp: invalid regexp: {}", e))
                        .with_details(json!({ "regexp": pattern }))
                })?;
                Ok(Mapping {
                    regexp,
                    value: row.get("value").cloned().unwrap_or(Value::Null),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(Self { mappings, on_no_match })
    }

    fn map(&self, text: &str) -> Result<Option<Value>, EngineError> {
        let matched: Vec<&Mapping> = self.mappings.iter().filter(|m| m.regexp.is_match(text)).collect();
        match matched.as_slice() {
            [] => Ok(None),
            [mapping] => Ok(Some(match &mapping.value {
                Value::String(template) => {
                    let mut out = String::new();
                    if let Some(caps) = mapping.regexp.captures(text) {
                        caps.expand(template, &mut out);
                    }
                    Value::String(out)
                }
                other => other.clone(),
            })),
            many => Err(EngineError::playback_code(
                "AmbiguousMatch",
                format!("{} regexps match {:?}", many.len(), text),
            )
            .with_retry(false)
            .with_details(json!({
                "text": text,
                "regexps": many.iter().map(|m| m.regexp.as_str()).collect::<Vec<_>>(),
            }))),
        }
    }
}

#[async_trait]
impl Pipe for MapRegexp {
    async fn apply(&self, input: Vec<Element>, _ctx: &RuntimeCtx) -> Result<Vec<Element>, EngineError> {
        let mut out = Vec::with_capacity(input.len());
        for el in input {
            let text = coerce_str(el.value()).into_owned();
            match self.map(&text)? {
                Some(value) => out.push(el.clone_with(value)),
                None => match self.on_no_match {
                    NoMatch::Discard => {}
                    NoMatch::Bypass => out.push(el),
                    NoMatch::Error => {
                        return Err(EngineError::playback_code(
                            "RegexpNotMatched",
                            format!("No regexp matches {:?}", text),
                        )
                        .with_details(json!({ "text": text })));
                    }
                },
            }
        }
        Ok(out)
    }
}

pub(super) fn defs() -> Vec<PipeDef> {
    vec![
        PipeDef::new(
            "Value.mapRange",
            Schema::new().param(ParamSpec::recordset("ranges").required()),
            |params| {
                let ranges = params
                    .recordset("ranges")
                    .iter()
                    .map(Range::from_row)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Arc::new(MapRange::new(ranges)?) as Arc<dyn Pipe>)
            },
        ),
        PipeDef::new(
            "Value.mapRegexp",
            Schema::new()
                .param(ParamSpec::recordset("mappings").required())
                .param(
                    ParamSpec::enumeration("onNoMatch", &["error", "discard", "bypass"])
                        .with_default(json!("error")),
                ),
            |params| {
                let on_no_match = NoMatch::parse(params.opt_str("onNoMatch"));
                Ok(Arc::new(MapRegexp::new(&params.recordset("mappings"), on_no_match)?) as Arc<dyn Pipe>)
            },
        ),
    ]
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod tests;
