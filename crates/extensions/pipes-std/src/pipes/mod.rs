//! Pipe catalog.

mod dom;
mod list;
mod mapping;
mod value;

use scriptflow_core::pipe::PipeDef;
use scriptflow_protocols::element::Element;
use serde_json::Value;

pub use dom::{GetText, GetUrl, QueryAll};
pub use list::{Any, CountBy, Direction, Every, Filter, FromArray, Repeat, SkipWhile, TakeWhile};
pub use mapping::{MapRange, MapRegexp, NoMatch, Range};
pub use value::{CallDefinition, Contains, ContainsText, Equals, GetGlobal, GetInput, GetJson, GetLocal, GetPath};

/// Every pipe type this crate provides.
pub fn catalog() -> Vec<PipeDef> {
    let mut defs = value::defs();
    defs.extend(list::defs());
    defs.extend(mapping::defs());
    defs.extend(dom::defs());
    defs
}

/// Source semantics: one element on a fresh document for empty input,
/// otherwise `value` bound to each input element's node.
pub(crate) fn emit(input: &[Element], value: Value) -> Vec<Element> {
    if input.is_empty() {
        return vec![Element::document(value)];
    }
    input.iter().map(|el| el.clone_with(value.clone())).collect()
}
