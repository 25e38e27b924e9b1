//! Extension contract: third-party crates contribute pipe and action types
//! without the core knowing them.

use std::sync::Arc;

use async_trait::async_trait;

use scriptflow_protocols::error::RegistryError;
use scriptflow_protocols::extension::ExtensionManifest;

use crate::registry::Resolver;

/// Context handed to an extension during initialization.
#[derive(Clone)]
pub struct ExtensionContext {
    /// Extension-specific configuration.
    pub config: serde_json::Value,
    /// Resolver to register types into.
    pub resolver: Arc<Resolver>,
}

impl ExtensionContext {
    pub fn new(config: serde_json::Value, resolver: Arc<Resolver>) -> Self {
        Self { config, resolver }
    }
}

/// Core trait for all extensions.
#[async_trait]
pub trait Extension: Send + Sync + 'static {
    /// Returns the extension manifest.
    fn manifest(&self) -> &ExtensionManifest;

    /// Register the extension's types.
    async fn initialize(&mut self, ctx: ExtensionContext) -> Result<(), RegistryError>;

    /// Shutdown the extension.
    async fn shutdown(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}
