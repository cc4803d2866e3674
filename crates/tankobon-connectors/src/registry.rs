//! Name-keyed connector lookup.

use crate::bato::Bato;
use crate::connector::Connector;
use std::collections::BTreeMap;
use std::sync::Arc;
use tankobon_types::Settings;

/// Registry of available connectors, keyed by case-insensitive name.
#[derive(Debug, Clone, Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in connector.
    ///
    /// # Errors
    ///
    /// Returns an error if a connector's HTTP client cannot be created.
    pub fn with_builtin(settings: &Arc<Settings>) -> Result<Self, reqwest::Error> {
        let mut registry = Self::new();
        registry.register(Arc::new(Bato::new(Arc::clone(settings))?));
        Ok(registry)
    }

    /// Registers `connector`, returning the connector it replaced, if any.
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> Option<Arc<dyn Connector>> {
        let key = connector.name().to_lowercase();
        tracing::debug!(connector = connector.name(), "registered connector");
        self.connectors.insert(key, connector)
    }

    /// Looks up a connector by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&name.to_lowercase()).cloned()
    }

    /// Returns the connector names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connectors.values().map(|c| c.name())
    }

    /// Iterates over all connectors in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Connector>> {
        self.connectors.values()
    }

    /// Number of registered connectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    /// Returns true if no connector is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
