//! # trawl-docstore
//!
//! Document-store connectivity for the Trawl import pipeline.
//!
//! This crate provides the driver seam the pipeline's connectors sit on: a
//! session bound to one database, cursors consumed one document at a time,
//! and textual filter parsing shared by every backend.
//!
//! ## Features
//!
//! - **Session/Cursor Traits**: backend-agnostic, forward-only consumption
//! - **Filter Parsing**: JSON-like query text into filter documents
//! - **MongoDB Backend**: official async driver, eager auth verification
//! - **Memory Backend**: seeded in-process collections for tests and local runs
//! - **Timeout Hardening**: bounded session open and per-fetch probes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trawl_docstore::prelude::*;
//!
//! let config = SessionConfig::new("catalog")
//!     .with_host("store.internal")
//!     .with_credentials("importer", "secret");
//!
//! let session = trawl_docstore::mongo::connect(&config).await?;
//! let filter = parse_filter(r#"{"status": "active"}"#)?;
//! let mut cursor = session.open_cursor("products", &filter).await?;
//!
//! while cursor.advance().await? {
//!     let row = cursor.current()?;
//!     println!("{row:?}");
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `mongodb` (default) - MongoDB support via the official async driver

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod memory;
pub mod query;
pub mod session;
pub mod types;

// Backend implementations (conditionally compiled)
#[cfg(feature = "mongodb")]
pub mod mongo;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Document and row types
    pub use crate::types::{Document, Row};

    // Filter parsing and matching
    pub use crate::query::{matches_filter, parse_filter};

    // Session traits and config
    pub use crate::session::{
        DocCursor, DocSession, SessionConfig, SessionFactory, StoreKind,
    };

    // Memory backend
    pub use crate::memory::{MemorySession, MemorySessionFactory, MemoryStore};

    // MongoDB backend
    #[cfg(feature = "mongodb")]
    pub use crate::mongo::{MongoSession, MongoSessionFactory};
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::{Document, Row};

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        // Ensure common types are accessible
        let _config = SessionConfig::new("catalog");
        let _store = MemoryStore::new();
        let _row = Row::new();
        let _kind = StoreKind::Memory;
    }

    #[test]
    fn test_error_types() {
        let err = Error::connection("test error");
        assert!(err.is_retriable());
        assert_eq!(err.category(), ErrorCategory::Connection);
    }

    #[test]
    fn test_filter_parsing() {
        let filter = parse_filter(r#"{"qty": {"$gte": 1}}"#).unwrap();
        let document = Document::new();
        assert!(!matches_filter(&document, &filter).unwrap());
    }

    #[test]
    fn test_config_defaults_match_store_conventions() {
        let config = SessionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 27017);
    }
}
