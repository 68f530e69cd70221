//! Connector implementations
//!
//! Each backend lives in its own module. [`create_connector_registry`]
//! assembles the factory registry for the enabled backends; binaries that
//! embed their own store (tests, local runs) build a registry by hand
//! instead and register a seeded memory factory.

use std::sync::Arc;

use crate::connector::ConnectorRegistry;

pub mod docstore;

pub use docstore::{DocStoreConnector, MemoryConnectorFactory};
#[cfg(feature = "mongodb")]
pub use docstore::MongoConnectorFactory;

/// Create a registry with factories for all enabled backends
pub fn create_connector_registry() -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::new();

    registry.register("memory", Arc::new(MemoryConnectorFactory::default()));

    #[cfg(feature = "mongodb")]
    registry.register("mongodb", Arc::new(MongoConnectorFactory));

    registry
}
