//! Flow actions extension definition.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use scriptflow_core::action::ActionType;
use scriptflow_core::extension::{Extension, ExtensionContext};
use scriptflow_protocols::error::RegistryError;
use scriptflow_protocols::extension::{ExtensionManifest, Provides};
use scriptflow_protocols::types::Version;

use crate::actions::catalog;

/// Extension registering control flow and data actions.
pub struct FlowActionsExtension {
    manifest: ExtensionManifest,
}

impl FlowActionsExtension {
    pub fn new() -> Self {
        let manifest = ExtensionManifest::new("actions-flow", "Flow Actions", Version::new(0, 1, 0))
            .with_description("Branches, loops, scripted failures, globals, locals, outputs and navigation")
            .with_provides(Provides {
                actions: catalog().iter().map(|def| def.type_name().to_string()).collect(),
                ..Default::default()
            });

        Self { manifest }
    }
}

impl Default for FlowActionsExtension {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extension for FlowActionsExtension {
    fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    async fn initialize(&mut self, ctx: ExtensionContext) -> Result<(), RegistryError> {
        for def in catalog() {
            debug!(action = def.type_name(), "Registering action");
            ctx.resolver.register_action(Arc::new(def))?;
        }
        Ok(())
    }
}
