//! Handler registry - maps intent names to handler factories
//!
//! Built once at startup and read-only afterwards, so it can be shared by
//! every conversation without locking.

use std::collections::HashMap;

use crate::handlers::launch::LAUNCH;
use crate::handlers::namespaces::{CREATE_NAMESPACE, GET_NAMESPACES, SWITCH_TO_NAMESPACE};
use crate::handlers::resources::{GET_DEPLOYMENTS, GET_DEPLOYMENT_CONFIGS, GET_SERVICES};
use crate::handlers::{
    CreateNamespace, GetNamespaces, HandlerFactory, Launch, ListResources, SwitchToNamespace,
};

/// Intent name to factory table
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<&'static str, HandlerFactory>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Every handler the skill ships with
    pub fn standard() -> Self {
        Self::new()
            .with(LAUNCH, Launch::create)
            .with(GET_NAMESPACES, GetNamespaces::create)
            .with(CREATE_NAMESPACE, CreateNamespace::create)
            .with(SWITCH_TO_NAMESPACE, SwitchToNamespace::create)
            .with(GET_DEPLOYMENTS, ListResources::deployments)
            .with(GET_DEPLOYMENT_CONFIGS, ListResources::deployment_configs)
            .with(GET_SERVICES, ListResources::services)
    }

    /// Register a factory, replacing any previous one for `intent`
    pub fn register(&mut self, intent: &'static str, factory: HandlerFactory) {
        self.factories.insert(intent, factory);
    }

    pub fn with(mut self, intent: &'static str, factory: HandlerFactory) -> Self {
        self.register(intent, factory);
        self
    }

    pub fn get(&self, intent: &str) -> Option<HandlerFactory> {
        self.factories.get(intent).copied()
    }

    pub fn contains(&self, intent: &str) -> bool {
        self.factories.contains_key(intent)
    }

    /// Registered intent names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
