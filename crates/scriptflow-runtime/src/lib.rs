//! # ScriptFlow Runtime
//!
//! Plays back scripts: loads the action tree from a JSON spec, walks it with
//! the [`Playback`] state machine and exposes the session as a [`Script`].
//!
//! ## Components
//!
//! - [`ActionTree`] - arena of actions grouped into named contexts
//! - [`transition`] - pure playhead moves (enter, next, repeat, finish)
//! - [`Playback`] - executes the action under the playhead and advances
//! - [`Script`] - owns the tree, globals, I/O and events of one session

mod events;
mod loader;
#[cfg(test)]
mod mock_units;
mod playback;
mod script;
mod settings;
pub mod transition;
mod tree;

pub use events::ScriptEvent;
pub use loader::{script_to_spec, LoadedScript, ScriptLoader};
pub use playback::Playback;
pub use script::Script;
pub use settings::ScriptSettings;
pub use transition::Transition;
pub use tree::{ActionNode, ActionTree, ScriptContext};
