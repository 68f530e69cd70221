//! Document-store connector
//!
//! [`DocStoreConnector`] adapts a [`DocSession`] to the [`DataConnector`]
//! seam: command text is parsed into a filter document, the cursor is
//! wrapped in a [`RowStream`], and a single-occupancy slot guarantees the
//! previous stream is closed before a new cursor is installed.
//!
//! Backend selection happens through the factories at the bottom of this
//! module; they translate [`StoreConfig`] into a session and hand the
//! connector over as a boxed [`DataConnector`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use trawl_docstore::memory::{MemorySessionFactory, MemoryStore};
use trawl_docstore::query::parse_filter;
use trawl_docstore::session::{DocSession, SessionConfig, SessionFactory, StoreKind};

use crate::config::StoreConfig;
use crate::connector::{ConnectorFactory, DataConnector};
use crate::error::ConnectorResult;
use crate::metrics::ImportMetrics;
use crate::stream::{CursorErrorPolicy, RowStream, SharedRowStream};

/// Map store configuration onto a session configuration
fn session_config(config: &StoreConfig) -> SessionConfig {
    let mut session = SessionConfig::new(&config.database)
        .with_host(&config.host)
        .with_port(config.port)
        .with_connect_timeout(config.connect_timeout_ms)
        .with_fetch_timeout(config.fetch_timeout_ms);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        session = session.with_credentials(username, password.expose_secret());
    }
    session
}

/// Connector over one document-store session
pub struct DocStoreConnector {
    session: Box<dyn DocSession>,
    kind: StoreKind,
    policy: CursorErrorPolicy,
    metrics: Arc<ImportMetrics>,
    active: Option<SharedRowStream>,
}

impl std::fmt::Debug for DocStoreConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStoreConnector")
            .field("kind", &self.kind)
            .field("database", &self.session.database())
            .field("active", &self.active.is_some())
            .finish()
    }
}

impl DocStoreConnector {
    /// Open a session per `config` and wrap it in a connector
    ///
    /// When credentials are configured the session is verified with an
    /// authenticated ping before the connector is handed out, so rejected
    /// credentials surface here and not on the first query.
    pub async fn connect(
        factory: &dyn SessionFactory,
        config: &StoreConfig,
        metrics: Arc<ImportMetrics>,
    ) -> ConnectorResult<Self> {
        let session = factory.open(&session_config(config)).await?;
        if config.username.is_some() {
            session.ping().await?;
        }

        info!(
            kind = %factory.store_kind(),
            host = %config.host,
            port = config.port,
            database = %config.database,
            "session established"
        );

        Ok(Self {
            session,
            kind: factory.store_kind(),
            policy: config.cursor_error_policy,
            metrics,
            active: None,
        })
    }

    /// The kind of store this connector talks to
    pub fn store_kind(&self) -> StoreKind {
        self.kind
    }
}

#[async_trait]
impl DataConnector for DocStoreConnector {
    async fn get_data(
        &mut self,
        command: &str,
        collection: &str,
    ) -> ConnectorResult<SharedRowStream> {
        // Single cursor slot: release the previous stream before anything
        // else so a parse failure cannot leak it.
        self.close().await;

        let filter = parse_filter(command)?;
        info!(collection = collection, command = command, "issuing command");

        let cursor = self.session.open_cursor(collection, &filter).await?;
        self.metrics.record_stream_opened();

        let stream =
            RowStream::new(cursor, self.policy, Arc::clone(&self.metrics)).into_shared();
        self.active = Some(Arc::clone(&stream));
        Ok(stream)
    }

    async fn close(&mut self) {
        if let Some(stream) = self.active.take() {
            stream.lock().await.close().await;
        }
    }
}

/// Factory for connectors over a shared in-memory store
///
/// Carries the store so tests and local runs can seed collections and
/// assert on cursor accounting after the import.
#[derive(Clone, Debug, Default)]
pub struct MemoryConnectorFactory {
    store: MemoryStore,
}

impl MemoryConnectorFactory {
    /// Create a factory over the given store
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    /// The underlying store, for seeding and assertions
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl ConnectorFactory for MemoryConnectorFactory {
    async fn create(
        &self,
        config: &StoreConfig,
        metrics: Arc<ImportMetrics>,
    ) -> ConnectorResult<Box<dyn DataConnector>> {
        let factory = MemorySessionFactory::new(self.store.clone());
        let connector = DocStoreConnector::connect(&factory, config, metrics).await?;
        Ok(Box::new(connector))
    }
}

/// Factory for MongoDB-backed connectors
#[cfg(feature = "mongodb")]
#[derive(Clone, Copy, Debug, Default)]
pub struct MongoConnectorFactory;

#[cfg(feature = "mongodb")]
#[async_trait]
impl ConnectorFactory for MongoConnectorFactory {
    async fn create(
        &self,
        config: &StoreConfig,
        metrics: Arc<ImportMetrics>,
    ) -> ConnectorResult<Box<dyn DataConnector>> {
        let factory = trawl_docstore::mongo::MongoSessionFactory;
        let connector = DocStoreConnector::connect(&factory, config, metrics).await?;
        Ok(Box::new(connector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use serde_json::json;

    fn store_config() -> StoreConfig {
        StoreConfig {
            kind: "memory".to_string(),
            database: "catalog".to_string(),
            ..Default::default()
        }
    }

    fn seeded() -> MemoryStore {
        MemoryStore::new().with_collection(
            "products",
            vec![
                json!({"_id": "a1", "name": "anvil"}),
                json!({"_id": "b2", "name": "bolt"}),
                json!({"_id": "c3", "name": "crate"}),
            ],
        )
    }

    async fn connect(store: &MemoryStore) -> DocStoreConnector {
        let factory = MemorySessionFactory::new(store.clone());
        DocStoreConnector::connect(&factory, &store_config(), Arc::new(ImportMetrics::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_data_streams_all_rows() {
        let store = seeded();
        let mut connector = connect(&store).await;

        let stream = connector.get_data("{}", "products").await.unwrap();
        let mut names = Vec::new();
        while let Some(row) = stream.lock().await.next().await.unwrap() {
            names.push(row.get_str("name").unwrap().to_string());
        }

        assert_eq!(names, vec!["anvil", "bolt", "crate"]);
        // Exhaustion released the cursor without an explicit close.
        assert_eq!(store.live_cursors(), 0);
    }

    #[tokio::test]
    async fn test_get_data_counts_stream_open() {
        let store = seeded();
        let metrics = Arc::new(ImportMetrics::new());
        let factory = MemorySessionFactory::new(store.clone());
        let mut connector =
            DocStoreConnector::connect(&factory, &store_config(), Arc::clone(&metrics))
                .await
                .unwrap();

        connector.get_data("{}", "products").await.unwrap();
        assert_eq!(metrics.snapshot().streams_opened, 1);
    }

    #[tokio::test]
    async fn test_second_get_data_closes_previous_stream() {
        let store = seeded();
        let mut connector = connect(&store).await;

        let first = connector.get_data("{}", "products").await.unwrap();
        first.lock().await.next().await.unwrap();

        let _second = connector.get_data("{}", "products").await.unwrap();
        assert_eq!(store.cursors_opened(), 2);
        assert_eq!(store.live_cursors(), 1);
        assert!(!first.lock().await.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = seeded();
        let mut connector = connect(&store).await;

        connector.get_data("{}", "products").await.unwrap();
        connector.close().await;
        connector.close().await;

        assert_eq!(store.live_cursors(), 0);
    }

    #[tokio::test]
    async fn test_connect_verifies_credentials() {
        let store = seeded().fail_ping_with("bad credentials");
        let factory = MemorySessionFactory::new(store.clone());
        let mut config = store_config();
        config.username = Some("importer".to_string());
        config.password = Some("wrong".into());

        let err =
            DocStoreConnector::connect(&factory, &config, Arc::new(ImportMetrics::new()))
                .await
                .unwrap_err();
        assert!(matches!(err, ConnectorError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_connect_without_credentials_skips_ping() {
        let store = seeded().fail_ping_with("bad credentials");
        let factory = MemorySessionFactory::new(store.clone());

        let result =
            DocStoreConnector::connect(&factory, &store_config(), Arc::new(ImportMetrics::new()))
                .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_command_is_query_error() {
        let store = seeded();
        let mut connector = connect(&store).await;

        let err = connector.get_data("{oops", "products").await.unwrap_err();
        assert!(matches!(err, ConnectorError::Query(_)));
        assert_eq!(store.cursors_opened(), 0);
    }

    #[tokio::test]
    async fn test_factory_creates_working_connector() {
        let store = seeded();
        let factory = MemoryConnectorFactory::new(store.clone());
        let mut connector = factory
            .create(&store_config(), Arc::new(ImportMetrics::new()))
            .await
            .unwrap();

        let stream = connector.get_data("{}", "products").await.unwrap();
        let row = stream.lock().await.next().await.unwrap().unwrap();
        assert_eq!(row.get_str("_id"), Some("a1"));
        connector.close().await;
    }
}
