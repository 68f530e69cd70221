//! # trawl-connect
//!
//! Connector SDK for the Trawl row-oriented import pipeline.
//!
//! This crate sits between an orchestrator and a document store: it loads
//! the import configuration, opens a connector over the configured backend,
//! and drives per-entity row streams through processors and transforms.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     orchestrator (caller)                  │
//! ├────────────────────────────────────────────────────────────┤
//! │  EntityProcessor ── next_row() ──► RowTransformer (hash)   │
//! │        │                                                   │
//! │  DataConnector ── get_data() ──► RowStream (single slot)   │
//! ├────────────────────────────────────────────────────────────┤
//! │           trawl-docstore (sessions and cursors)            │
//! │              ├── MongoDB (official driver)                 │
//! │              └── Memory (tests, local runs)                │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Connector Seam**: [`DataConnector`] plus a factory registry, selected
//!   by the configured store kind
//! - **Entity Processors**: one query per run, rows pulled one at a time
//! - **Row Streams**: implicit close on exhaustion, configurable fault policy
//! - **Identifier Hashing**: stable FNV-1a rewrite of opaque identifiers
//! - **YAML Config**: `${ENV}` expansion, validation, redacted secrets
//! - **Import Metrics**: shared atomic counters, snapshotable
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trawl_connect::prelude::*;
//!
//! let config = ImportConfig::from_file("import.yaml")?;
//! let metrics = Arc::new(ImportMetrics::new());
//!
//! let registry = create_connector_registry();
//! let connector: SharedConnector = Arc::new(tokio::sync::Mutex::new(
//!     registry.create(&config.store, Arc::clone(&metrics)).await?,
//! ));
//!
//! for (name, entity) in config.enabled_entities() {
//!     let mut processor =
//!         EntityProcessor::new(name, entity.clone(), Arc::clone(&metrics));
//!     processor.init(EntityContext::new(name, RunMode::Full), Arc::clone(&connector))?;
//!
//!     let transformer = IdHashTransformer::for_entity(entity);
//!     while let Some(row) = processor.next_row().await? {
//!         let row = transformer.transform(row, &context)?;
//!         // hand the row to the caller
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `mongodb` (default) - MongoDB backend via trawl-docstore

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod connector;
pub mod connectors;
pub mod context;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod stream;
pub mod testing;
pub mod transform;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{EntityConfig, FieldConfig, ImportConfig, StoreConfig};
pub use connector::{ConnectorFactory, ConnectorRegistry, DataConnector, SharedConnector};
pub use connectors::create_connector_registry;
pub use context::{EntityContext, RunMode};
pub use error::{ConnectorError, ConnectorResult};
pub use metrics::{ImportMetrics, ImportStats};
pub use processor::{EntityProcessor, ProcessorState};
pub use stream::{CursorErrorPolicy, RowStream, SharedRowStream};
pub use transform::{IdHashTransformer, RowTransformer, TransformerRegistry};
pub use types::SensitiveString;

// Row and document types come from the store layer
pub use trawl_docstore::{Document, Row};

// Re-export commonly used dependencies for connector implementations
pub use async_trait::async_trait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        async_trait,
        create_connector_registry,
        // Connector seam
        ConnectorError,
        ConnectorFactory,
        ConnectorRegistry,
        ConnectorResult,
        // Streams
        CursorErrorPolicy,
        DataConnector,
        Document,
        // Config
        EntityConfig,
        EntityContext,
        // Processor
        EntityProcessor,
        FieldConfig,
        // Transforms
        IdHashTransformer,
        ImportConfig,
        // Metrics
        ImportMetrics,
        ImportStats,
        ProcessorState,
        Row,
        RowStream,
        RowTransformer,
        RunMode,
        SensitiveString,
        SharedConnector,
        SharedRowStream,
        StoreConfig,
        TransformerRegistry,
    };

    // Re-export validation and schema traits
    pub use schemars::JsonSchema;
    pub use validator::Validate;

    // Store-layer pieces connectors commonly need
    pub use trawl_docstore::session::{DocCursor, DocSession, SessionConfig, SessionFactory};
}
