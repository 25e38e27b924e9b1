//! Standard pipes extension definition.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use scriptflow_core::extension::{Extension, ExtensionContext};
use scriptflow_core::pipe::PipeType;
use scriptflow_protocols::error::RegistryError;
use scriptflow_protocols::extension::{ExtensionManifest, Provides};
use scriptflow_protocols::types::Version;

use crate::pipes::catalog;

/// Extension registering the standard pipe catalog.
pub struct StdPipesExtension {
    manifest: ExtensionManifest,
}

impl StdPipesExtension {
    pub fn new() -> Self {
        let manifest = ExtensionManifest::new("pipes-std", "Standard Pipes", Version::new(0, 1, 0))
            .with_description("Value sources and transforms, list folds, mappings and page queries")
            .with_provides(Provides {
                pipes: catalog().iter().map(|def| def.type_name().to_string()).collect(),
                ..Default::default()
            });

        Self { manifest }
    }
}

impl Default for StdPipesExtension {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for StdPipesExtension {
    fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    async fn initialize(&mut self, ctx: ExtensionContext) -> Result<(), RegistryError> {
        for def in catalog() {
            debug!(pipe = def.type_name(), "Registering pipe");
            ctx.resolver.register_pipe(Arc::new(def))?;
        }
        Ok(())
    }
}
