//! Built-in actions for ScriptFlow.
//!
//! Provides the control-flow family (`if`/`elseIf`/`else`, `each`, `while`,
//! `find`, `group`), scripted failures, globals and locals, script I/O and
//! page navigation.

mod actions;
mod extension;

pub use actions::*;
pub use extension::FlowActionsExtension;
