//! Backend-class routing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::provider::Provider;
use crate::types::task::BackendClass;

/// Maps each task's backend class to a provider, with a default for
/// unmapped classes.
#[derive(Clone)]
pub struct ProviderRouter {
    default: Arc<dyn Provider>,
    routes: HashMap<BackendClass, Arc<dyn Provider>>,
}

impl ProviderRouter {
    /// Route everything to `default`.
    pub fn new(default: Arc<dyn Provider>) -> Self {
        Self {
            default,
            routes: HashMap::new(),
        }
    }

    /// Route one backend class to a specific provider.
    pub fn with_route(mut self, class: BackendClass, provider: Arc<dyn Provider>) -> Self {
        self.routes.insert(class, provider);
        self
    }

    /// The provider for a backend class.
    pub fn for_class(&self, class: BackendClass) -> Arc<dyn Provider> {
        self.routes
            .get(&class)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// The default provider; also used for term expansion and extraction.
    pub fn default_provider(&self) -> Arc<dyn Provider> {
        self.default.clone()
    }
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: HashMap<_, _> = self
            .routes
            .iter()
            .map(|(class, provider)| (class.as_str(), provider.name()))
            .collect();
        f.debug_struct("ProviderRouter")
            .field("default", &self.default.name())
            .field("routes", &routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[test]
    fn test_routes_and_default() {
        let router = ProviderRouter::new(Arc::new(MockProvider::new("openai")))
            .with_route(BackendClass::WebSearch, Arc::new(MockProvider::new("tavily")));

        assert_eq!(router.for_class(BackendClass::WebSearch).name(), "tavily");
        assert_eq!(router.for_class(BackendClass::Directory).name(), "openai");
        assert_eq!(router.default_provider().name(), "openai");
    }
}
