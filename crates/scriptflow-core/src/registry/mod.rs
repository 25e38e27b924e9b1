//! Registries for pipe/action types and extensions.

mod base;
mod extension;
mod resolver;

pub use base::{BaseRegistry, Registerable};
pub use extension::ExtensionRegistry;
pub use resolver::Resolver;
