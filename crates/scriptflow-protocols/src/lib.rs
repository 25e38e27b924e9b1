//! # ScriptFlow Protocols
//!
//! Data model and boundary contracts shared by every ScriptFlow crate.
//! Contains no engine logic.
//!
//! ## Contents
//!
//! - [`Element`] - a value bound to a position in a document
//! - [`compare`] - cross-type equality and containment used by pipes
//! - [`Page`] - the browser page capability consumed by actions and pipes
//! - [`Schema`] - declarative parameter metadata of actions and pipes
//! - [`ScriptIo`] - output/input events exchanged with the outside world
//! - [`EngineError`] - the error taxonomy and its stable [`ErrorInfo`] shape

pub mod compare;
pub mod element;
pub mod error;
pub mod extension;
pub mod io;
pub mod page;
pub mod schema;
pub mod types;

pub use compare::{any_contains, any_equals, normalize_str, str_contains, str_equals};
pub use element::{value_type_name, Element, NodeRef};
pub use error::{EngineError, ErrorInfo, RegistryError};
pub use extension::{ExtensionManifest, Provides};
pub use io::{MemoryIo, ScriptIo};
pub use page::Page;
pub use schema::{ParamKind, ParamSpec, Schema};
pub use types::*;
