//! # ScriptFlow Core
//!
//! Execution core shared by the playback runtime and by extensions.
//!
//! ## Components
//!
//! - [`Pipeline`] - ordered pipes evaluated as a left-to-right fold
//! - [`Pipe`] / [`Action`] - contracts implemented by pipe and action types
//! - [`Resolver`] - type name lookup with unresolved sentinels and renames
//! - [`RuntimeCtx`] - locals stack, globals, definitions, introspection and
//!   capabilities passed into every evaluation
//! - [`retry`] - bounded retry of retriable errors

pub mod action;
pub mod context;
pub mod extension;
pub mod pipe;
pub mod pipeline;
pub mod registry;
pub mod retry;
pub mod unit;

pub use action::{
    Action, ActionContext, ActionDef, ActionKind, ActionType, ActionUnit, RunState, SiblingState,
};
pub use context::{
    BrowserHandle, Definition, Definitions, Globals, Introspection, IntrospectionEntry, LocalsStack,
    RuntimeCtx,
};
pub use extension::{Extension, ExtensionContext};
pub use pipe::{Pipe, PipeDef, PipeNode, PipeType};
pub use pipeline::Pipeline;
pub use registry::{ExtensionRegistry, Resolver};
pub use retry::{retry, RetryConfig, RetryOptions};
pub use unit::{read_params, ParamValue, Params, UnitSpec};
