//! Error types for trawl-docstore
//!
//! Provides granular error classification for proper failure handling:
//! - Retriable errors (connection, timeout)
//! - Non-retriable errors (authentication, malformed filters, absent config)

use std::fmt;
use thiserror::Error;

/// Result type for trawl-docstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection-related errors (retriable)
    Connection,
    /// Authentication failure
    Authentication,
    /// Configuration error
    Configuration,
    /// Query parse or execution errors
    Query,
    /// Cursor iteration errors
    Cursor,
    /// Timeout errors (retriable)
    Timeout,
    /// Value conversion errors (not retriable)
    TypeConversion,
    /// Unknown/other errors
    Other,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout)
    }
}

/// Main error type for trawl-docstore
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Session could not be established or was lost
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credentials were rejected by the store
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Required setting absent or invalid
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Filter parse or query execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        filter: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cursor advance or release failed mid-stream
    #[error("cursor error: {message}")]
    Cursor {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out
    #[error("timeout: {message}")]
    Timeout { message: String },

    /// Value conversion failed
    #[error("type conversion error: {message}")]
    TypeConversion { message: String },

    /// Unsupported operation for this backend
    #[error("unsupported: {message}")]
    Unsupported { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Cursor { .. } => ErrorCategory::Cursor,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::TypeConversion { .. } => ErrorCategory::TypeConversion,
            Self::Unsupported { .. } => ErrorCategory::Other,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            filter: None,
            source: None,
        }
    }

    /// Create a query error carrying the offending filter text
    pub fn query_with_filter(message: impl Into<String>, filter: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            filter: Some(filter.into()),
            source: None,
        }
    }

    /// Create a query error with source
    pub fn query_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Query {
            message: message.into(),
            filter: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a cursor error
    pub fn cursor(message: impl Into<String>) -> Self {
        Self::Cursor {
            message: message.into(),
            source: None,
        }
    }

    /// Create a cursor error with source
    pub fn cursor_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Cursor {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Authentication => write!(f, "authentication"),
            Self::Configuration => write!(f, "configuration"),
            Self::Query => write!(f, "query"),
            Self::Cursor => write!(f, "cursor"),
            Self::Timeout => write!(f, "timeout"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Other => write!(f, "other"),
        }
    }
}
