//! Connector seam between the import pipeline and a store backend
//!
//! [`DataConnector`] is the capability an entity processor pulls rows
//! through: issue a command against a named collection, get back a shared
//! row stream. A connector owns one session and one cursor slot; issuing a
//! new command closes the previous stream before installing the new one.
//!
//! [`ConnectorFactory`] opens a session from [`StoreConfig`] and builds a
//! connector over it. Factories are looked up by backend kind through a
//! [`ConnectorRegistry`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::metrics::ImportMetrics;
use crate::stream::SharedRowStream;

/// A connector bound to one store session
#[async_trait]
pub trait DataConnector: Send + Sync + std::fmt::Debug {
    /// Issue `command` against `collection` and return the row stream
    ///
    /// The cursor slot is single-occupancy: a stream from a previous call
    /// is closed before the new cursor replaces it.
    async fn get_data(
        &mut self,
        command: &str,
        collection: &str,
    ) -> ConnectorResult<SharedRowStream>;

    /// Release the active cursor, if any
    ///
    /// Idempotent and safe when no cursor is active; release failures are
    /// logged, never raised.
    async fn close(&mut self);
}

/// Shared handle to one connector
///
/// One connector may serve several entity processors over a run; the lock
/// serializes access to the single cursor slot.
pub type SharedConnector = Arc<Mutex<Box<dyn DataConnector>>>;

/// Factory creating connectors from store configuration
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    /// Open a session per `config` and build a connector over it
    async fn create(
        &self,
        config: &StoreConfig,
        metrics: Arc<ImportMetrics>,
    ) -> ConnectorResult<Box<dyn DataConnector>>;
}

/// Registry of connector factories keyed by backend kind
pub struct ConnectorRegistry {
    factories: HashMap<String, Arc<dyn ConnectorFactory>>,
}

impl ConnectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under a backend kind
    pub fn register(&mut self, kind: &str, factory: Arc<dyn ConnectorFactory>) {
        self.factories.insert(kind.to_string(), factory);
    }

    /// Get a factory by backend kind
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ConnectorFactory>> {
        self.factories.get(kind)
    }

    /// Create a connector for the backend kind named in `config`
    pub async fn create(
        &self,
        config: &StoreConfig,
        metrics: Arc<ImportMetrics>,
    ) -> ConnectorResult<Box<dyn DataConnector>> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            ConnectorError::config(format!("unknown store kind '{}'", config.kind))
        })?;
        factory.create(config, metrics).await
    }

    /// Registered backend kinds
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }

    /// Check if a backend kind is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullFactory;

    #[async_trait]
    impl ConnectorFactory for NullFactory {
        async fn create(
            &self,
            _config: &StoreConfig,
            _metrics: Arc<ImportMetrics>,
        ) -> ConnectorResult<Box<dyn DataConnector>> {
            Err(ConnectorError::config("null factory"))
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = ConnectorRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ConnectorRegistry::new();
        registry.register("null", Arc::new(NullFactory));

        assert!(registry.contains("null"));
        assert!(registry.get("null").is_some());
        assert_eq!(registry.kinds(), vec!["null"]);
    }

    #[tokio::test]
    async fn test_create_unknown_kind_fails() {
        let registry = ConnectorRegistry::new();
        let config = StoreConfig {
            kind: "martian".to_string(),
            database: "catalog".to_string(),
            ..Default::default()
        };

        let err = registry
            .create(&config, Arc::new(ImportMetrics::new()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("martian"), "got: {}", err);
        assert!(err.is_fatal());
    }
}
