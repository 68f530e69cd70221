//! Error types for trawl-connect
//!
//! One taxonomy for everything a connector run can surface: configuration,
//! connection/authentication at init, query faults during a pull, and the
//! transform's missing-column failure. Store-layer errors fold into the same
//! taxonomy by category.

use thiserror::Error;

/// Result type alias for connector operations
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Errors surfaced by connectors, processors, and transforms
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Required setting absent or invalid; the message names the key
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Session to the store could not be established
    #[error("connection error: {0}")]
    Connection(String),

    /// Credentials rejected by the store
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Command parse failure or execution fault during a pull
    #[error("query error: {0}")]
    Query(String),

    /// Transform referenced a column the row does not carry
    #[error("missing field: column '{column}' not present in row")]
    MissingField {
        /// The configured column that was absent
        column: String,
    },

    /// Timeout waiting on the store
    #[error("timeout: {0}")]
    Timeout(String),

    /// YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a query error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a missing-field error for the given column
    pub fn missing_field(column: impl Into<String>) -> Self {
        Self::MissingField {
            column: column.into(),
        }
    }

    /// Whether this error aborts the run with no retry
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Authentication(_) | Self::MissingField { .. }
        )
    }

    /// Whether this error may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Fold store-layer errors into the connector taxonomy by category
impl From<trawl_docstore::Error> for ConnectorError {
    fn from(err: trawl_docstore::Error) -> Self {
        use trawl_docstore::error::ErrorCategory;
        match err.category() {
            ErrorCategory::Configuration => Self::Configuration(err.to_string()),
            ErrorCategory::Connection => Self::Connection(err.to_string()),
            ErrorCategory::Authentication => Self::Authentication(err.to_string()),
            ErrorCategory::Timeout => Self::Timeout(err.to_string()),
            _ => Self::Query(err.to_string()),
        }
    }
}
