//! Extension metadata.
//!
//! Extensions contribute action and pipe types to the resolver without
//! recompiling the engine.

mod manifest;

pub use manifest::*;
