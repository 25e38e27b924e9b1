//! Runtime context threaded through every action and pipe evaluation.

mod browser;
mod definitions;
mod globals;
mod introspection;
mod locals;
mod runtime;

pub use browser::BrowserHandle;
pub use definitions::{Definition, Definitions};
pub use globals::Globals;
pub use introspection::{EntryKind, Introspection, IntrospectionEntry, OutputCount};
pub use locals::{LocalsStack, StackFrame};
pub use runtime::RuntimeCtx;
