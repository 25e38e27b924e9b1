//! Error types for the ScriptFlow engine.

mod engine;
mod registry;

pub use engine::*;
pub use registry::*;
