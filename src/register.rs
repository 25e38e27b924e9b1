//! Extension registration for ScriptFlow.

use std::sync::Arc;

use tracing::info;

use scriptflow_actions_flow::FlowActionsExtension;
use scriptflow_config::Config;
use scriptflow_core::extension::Extension;
use scriptflow_core::registry::{ExtensionRegistry, Resolver};
use scriptflow_pipes_std::StdPipesExtension;
use scriptflow_protocols::error::RegistryError;

/// Extensions shipped with the binary.
fn builtin_extensions() -> Vec<Box<dyn Extension>> {
    vec![
        Box::new(StdPipesExtension::new()),
        Box::new(FlowActionsExtension::new()),
    ]
}

/// Build a resolver with the configured renames and every enabled
/// extension loaded.
pub(crate) async fn build_resolver(config: &Config) -> Result<Arc<Resolver>, RegistryError> {
    let resolver = Arc::new(Resolver::new());
    for (from, to) in &config.resolver.renames {
        resolver.add_rename(from, to);
    }

    let registry = ExtensionRegistry::new();
    for extension in builtin_extensions() {
        let id = extension.manifest().id.clone();
        if !config.extensions.is_enabled(&id) {
            info!("Extension disabled: {}", id);
            continue;
        }
        registry
            .load(extension, config.extensions.settings_for(&id), resolver.clone())
            .await?;
    }

    info!(
        actions = resolver.list_actions().len(),
        pipes = resolver.list_pipes().len(),
        "Resolver ready"
    );
    Ok(resolver)
}
