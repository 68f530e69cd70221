//! Session traits for trawl-docstore
//!
//! Core abstractions for document-store connectivity:
//! - DocSession: an authenticated handle bound to one database
//! - DocCursor: incremental consumption of one query's result set
//! - SessionFactory: backend-selectable session construction

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{Document, Row};

/// Configuration for opening a session
#[derive(Clone)]
pub struct SessionConfig {
    /// Store endpoint host
    pub host: String,
    /// Store endpoint port
    pub port: u16,
    /// Optional credential pair; username set means authentication is required
    pub username: Option<String>,
    /// Password, required when username is set
    pub password: Option<String>,
    /// Target database name (required)
    pub database: String,
    /// Application name reported to the store
    pub application_name: Option<String>,
    /// Session open timeout in milliseconds (0 = no timeout)
    pub connect_timeout_ms: u64,
    /// Per-fetch cursor timeout in milliseconds (0 = no timeout)
    pub fetch_timeout_ms: u64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Redact the password to keep credentials out of logs.
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("application_name", &self.application_name)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("fetch_timeout_ms", &self.fetch_timeout_ms)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 27017,
            username: None,
            password: None,
            database: String::new(),
            application_name: Some("trawl-docstore".into()),
            connect_timeout_ms: 10_000,
            fetch_timeout_ms: 30_000,
        }
    }
}

impl SessionConfig {
    /// Create configuration for the given database on the default endpoint
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the endpoint port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the credential pair
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the session open timeout
    pub fn with_connect_timeout(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Set the per-fetch cursor timeout
    pub fn with_fetch_timeout(mut self, ms: u64) -> Self {
        self.fetch_timeout_ms = ms;
        self
    }

    /// Set the application name reported to the store
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Endpoint rendered as `host:port` for logs
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the required settings are present
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Error::config("database is required"));
        }
        if self.username.is_some() && self.password.is_none() {
            return Err(Error::config("password is required when username is set"));
        }
        Ok(())
    }
}

/// A server-side cursor over one query's result set
///
/// Consumption is forward-only: `advance` fetches the next document (the
/// blocking probe), `current` materializes it. Implementations must tolerate
/// `close` being called repeatedly and after exhaustion.
#[async_trait]
pub trait DocCursor: Send + std::fmt::Debug {
    /// Advance to the next document; `false` means the result set is exhausted
    async fn advance(&mut self) -> Result<bool>;

    /// Materialize the current document as a row
    ///
    /// Only valid after `advance` returned `true`; every key/value pair is
    /// copied verbatim.
    fn current(&self) -> Result<Row>;

    /// Release the server-side cursor
    async fn close(&mut self) -> Result<()>;
}

/// An authenticated session bound to one database
#[async_trait]
pub trait DocSession: Send + Sync + std::fmt::Debug {
    /// Open a cursor over `collection` matching `filter`
    ///
    /// The collection handle is resolved on every call; nothing is cached
    /// across distinct collection names.
    async fn open_cursor(&self, collection: &str, filter: &Document)
        -> Result<Box<dyn DocCursor>>;

    /// Round-trip connectivity and authentication probe
    async fn ping(&self) -> Result<()>;

    /// Name of the database this session is bound to
    fn database(&self) -> &str;
}

/// Factory for opening sessions against one kind of store
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new session
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn DocSession>>;

    /// Get the store kind this factory produces sessions for
    fn store_kind(&self) -> StoreKind;
}

/// Store kind identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// MongoDB or a wire-compatible server
    MongoDb,
    /// In-process memory store (tests, local runs)
    Memory,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MongoDb => write!(f, "MongoDB"),
            Self::Memory => write!(f, "Memory"),
        }
    }
}
