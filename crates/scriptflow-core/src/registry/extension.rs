//! Extension registry for managing loaded extensions.

use dashmap::DashMap;
use std::sync::Arc;

use tracing::info;

use scriptflow_protocols::error::RegistryError;
use scriptflow_protocols::extension::ExtensionManifest;

use super::Resolver;
use crate::extension::{Extension, ExtensionContext};

/// Registry for managing extensions.
pub struct ExtensionRegistry {
    extensions: DashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create a new extension registry.
    pub fn new() -> Self {
        Self {
            extensions: DashMap::new(),
        }
    }

    /// Initialize `extension` against `resolver` and register it.
    pub async fn load(
        &self,
        mut extension: Box<dyn Extension>,
        config: serde_json::Value,
        resolver: Arc<Resolver>,
    ) -> Result<(), RegistryError> {
        let manifest = extension.manifest();
        let id = manifest.id.clone();

        if self.extensions.contains_key(&id) {
            return Err(RegistryError::ExtensionAlreadyRegistered(id));
        }

        info!("Loading extension: {} v{}", manifest.name, manifest.version);

        extension
            .initialize(ExtensionContext::new(config, resolver))
            .await?;
        self.register(Arc::from(extension))?;

        info!("Extension loaded: {}", id);
        Ok(())
    }

    /// Register an extension.
    pub fn register(&self, extension: Arc<dyn Extension>) -> Result<(), RegistryError> {
        let id = extension.manifest().id.clone();

        if self.extensions.contains_key(&id) {
            return Err(RegistryError::ExtensionAlreadyRegistered(id));
        }

        self.extensions.insert(id, extension);
        Ok(())
    }

    /// Get an extension by ID.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get(id).map(|e| e.clone())
    }

    /// List all registered extensions.
    pub fn list(&self) -> Vec<ExtensionManifest> {
        self.extensions
            .iter()
            .map(|e| e.manifest().clone())
            .collect()
    }

    /// Check if an extension is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.extensions.contains_key(id)
    }

    /// Shut down and drop all extensions.
    pub async fn shutdown_all(&self) {
        let extensions: Vec<Arc<dyn Extension>> = self.extensions.iter().map(|e| e.clone()).collect();
        for extension in extensions {
            if let Err(e) = extension.shutdown().await {
                tracing::warn!("Failed to shut down {}: {}", extension.manifest().id, e);
            }
        }
        self.extensions.clear();
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scriptflow_protocols::extension::Provides;
    use scriptflow_protocols::schema::Schema;
    use scriptflow_protocols::types::Version;

    use crate::action::{Action, ActionContext, ActionDef};
    use scriptflow_protocols::error::EngineError;

    struct Noop;

    #[async_trait]
    impl Action for Noop {
        async fn exec(&self, _ctx: &mut ActionContext<'_>) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct MockExtension {
        manifest: ExtensionManifest,
    }

    impl MockExtension {
        fn new(id: &str) -> Self {
            Self {
                manifest: ExtensionManifest::new(id, format!("Mock {}", id), Version::new(1, 0, 0))
                    .with_description("A mock extension")
                    .with_provides(Provides {
                        actions: vec![format!("{}.noop", id)],
                        pipes: Vec::new(),
                    }),
            }
        }
    }

    #[async_trait]
    impl Extension for MockExtension {
        fn manifest(&self) -> &ExtensionManifest {
            &self.manifest
        }

        async fn initialize(&mut self, ctx: ExtensionContext) -> Result<(), RegistryError> {
            for name in &self.manifest.provides.actions {
                ctx.resolver.register_action(Arc::new(ActionDef::new(
                    name.clone(),
                    Schema::new(),
                    |_| Ok(Arc::new(Noop) as Arc<dyn Action>),
                )))?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_registry_default() {
        let registry = ExtensionRegistry::default();
        assert!(registry.list().is_empty());
    }

    #[tokio::test]
    async fn test_load_registers_types() {
        let registry = ExtensionRegistry::new();
        let resolver = Arc::new(Resolver::new());

        registry
            .load(Box::new(MockExtension::new("mock")), serde_json::Value::Null, resolver.clone())
            .await
            .unwrap();

        assert!(registry.contains("mock"));
        assert_eq!(resolver.list_actions(), vec!["mock.noop"]);
    }

    #[tokio::test]
    async fn test_load_duplicate_extension() {
        let registry = ExtensionRegistry::new();
        let resolver = Arc::new(Resolver::new());
        registry
            .load(Box::new(MockExtension::new("mock")), serde_json::Value::Null, resolver.clone())
            .await
            .unwrap();

        let result = registry
            .load(Box::new(MockExtension::new("mock")), serde_json::Value::Null, resolver)
            .await;
        assert!(matches!(result, Err(RegistryError::ExtensionAlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn test_type_conflict_between_extensions() {
        let resolver = Arc::new(Resolver::new());
        let mut first = MockExtension::new("mock");
        first
            .initialize(ExtensionContext::new(serde_json::Value::Null, resolver.clone()))
            .await
            .unwrap();
        let mut second = MockExtension::new("mock");
        let result = second
            .initialize(ExtensionContext::new(serde_json::Value::Null, resolver))
            .await;
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_all() {
        let registry = ExtensionRegistry::new();
        registry.register(Arc::new(MockExtension::new("a"))).unwrap();
        registry.register(Arc::new(MockExtension::new("b"))).unwrap();
        assert_eq!(registry.list().len(), 2);
        registry.shutdown_all().await;
        assert!(registry.list().is_empty());
        assert!(registry.get("a").is_none());
    }
}
