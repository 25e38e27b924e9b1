//! Standard pipes for ScriptFlow.
//!
//! Provides value sources and transforms, list folds and windows, range and
//! regexp mappings, and page queries.

mod extension;
mod pipes;

pub use extension::StdPipesExtension;
pub use pipes::*;
