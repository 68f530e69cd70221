//! Testing utilities for connectors
//!
//! Scripted implementations of the connector seam so pipeline code can be
//! exercised without a store. [`MockConnector`] plays configured rows back
//! through a real [`RowStream`] over a scripted cursor, so lifecycle
//! behavior (single-slot replacement, implicit close, error policy) matches
//! the production path.
//!
//! # Example
//!
//! ```rust,ignore
//! use trawl_connect::testing::*;
//!
//! #[tokio::test]
//! async fn test_my_pipeline() {
//!     let connector = MockConnector::new().with_rows(rows::sequential(3));
//!     let probe = connector.probe();
//!
//!     let shared = connector.into_shared();
//!     // ... drive an EntityProcessor over `shared` ...
//!
//!     assert_eq!(probe.issued_count(), 1);
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use trawl_docstore::session::DocCursor;
use trawl_docstore::{Document, Error as StoreError, Row};

use crate::connector::{DataConnector, SharedConnector};
use crate::error::{ConnectorError, ConnectorResult};
use crate::metrics::ImportMetrics;
use crate::stream::{CursorErrorPolicy, RowStream, SharedRowStream};

/// One command as the mock received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCommand {
    /// Command text after any token substitution upstream
    pub command: String,
    /// Collection the command was issued against
    pub collection: String,
}

/// Observer handle onto a mock connector's recorded activity
///
/// Stays valid after the connector moves into a shared handle.
#[derive(Clone)]
pub struct MockProbe {
    issued: Arc<Mutex<Vec<IssuedCommand>>>,
    closes: Arc<Mutex<usize>>,
}

impl MockProbe {
    /// Commands issued so far, oldest first
    pub fn issued(&self) -> Vec<IssuedCommand> {
        self.issued.lock().clone()
    }

    /// Number of commands issued so far
    pub fn issued_count(&self) -> usize {
        self.issued.lock().len()
    }

    /// Number of times the cursor slot was actually released
    pub fn close_count(&self) -> usize {
        *self.closes.lock()
    }
}

/// A scripted connector for testing
pub struct MockConnector {
    rows: Arc<Mutex<Vec<Document>>>,
    fail_get_data: Arc<Mutex<Option<String>>>,
    fail_advance_after: Arc<Mutex<Option<(usize, String)>>>,
    policy: CursorErrorPolicy,
    metrics: Arc<ImportMetrics>,
    issued: Arc<Mutex<Vec<IssuedCommand>>>,
    closes: Arc<Mutex<usize>>,
    active: Option<SharedRowStream>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("rows", &self.rows.lock().len())
            .field("issued", &self.issued.lock().len())
            .field("active", &self.active.is_some())
            .finish()
    }
}

impl MockConnector {
    /// Create a mock with no rows
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            fail_get_data: Arc::new(Mutex::new(None)),
            fail_advance_after: Arc::new(Mutex::new(None)),
            policy: CursorErrorPolicy::default(),
            metrics: Arc::new(ImportMetrics::new()),
            issued: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(0)),
            active: None,
        }
    }

    /// Set the rows every issued command plays back
    ///
    /// Entries that are not JSON documents are ignored.
    pub fn with_rows(self, rows: Vec<Value>) -> Self {
        *self.rows.lock() = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self
    }

    /// Make every `get_data` call fail with a query error
    pub fn fail_get_data_with(self, message: impl Into<String>) -> Self {
        *self.fail_get_data.lock() = Some(message.into());
        self
    }

    /// Make played-back cursors fail on their n-th advance
    pub fn fail_advance_after(self, n: usize, message: impl Into<String>) -> Self {
        *self.fail_advance_after.lock() = Some((n, message.into()));
        self
    }

    /// Set the error policy for played-back streams
    pub fn with_policy(mut self, policy: CursorErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Share a metrics handle with the streams the mock creates
    pub fn with_metrics(mut self, metrics: Arc<ImportMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Observer handle that outlives the connector
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            issued: Arc::clone(&self.issued),
            closes: Arc::clone(&self.closes),
        }
    }

    /// Box the mock into a shared connector handle
    pub fn into_shared(self) -> SharedConnector {
        Arc::new(tokio::sync::Mutex::new(
            Box::new(self) as Box<dyn DataConnector>
        ))
    }
}

#[async_trait]
impl DataConnector for MockConnector {
    async fn get_data(
        &mut self,
        command: &str,
        collection: &str,
    ) -> ConnectorResult<SharedRowStream> {
        self.close().await;

        if let Some(message) = self.fail_get_data.lock().clone() {
            return Err(ConnectorError::query(message));
        }

        self.issued.lock().push(IssuedCommand {
            command: command.to_string(),
            collection: collection.to_string(),
        });

        let cursor = MockCursor::new(self.rows.lock().clone())
            .with_fail_after(self.fail_advance_after.lock().clone());
        let stream = RowStream::new(Box::new(cursor), self.policy, Arc::clone(&self.metrics))
            .into_shared();
        self.active = Some(Arc::clone(&stream));
        Ok(stream)
    }

    async fn close(&mut self) {
        if let Some(stream) = self.active.take() {
            stream.lock().await.close().await;
            *self.closes.lock() += 1;
        }
    }
}

/// A scripted cursor playing back a fixed document list
#[derive(Debug)]
pub struct MockCursor {
    remaining: std::vec::IntoIter<Document>,
    current: Option<Document>,
    advances: usize,
    fail_after: Option<(usize, String)>,
    closed: bool,
}

impl MockCursor {
    /// Create a cursor over the given documents
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            remaining: documents.into_iter(),
            current: None,
            advances: 0,
            fail_after: None,
            closed: false,
        }
    }

    /// Script a failure on the n-th advance
    pub fn with_fail_after(mut self, fail_after: Option<(usize, String)>) -> Self {
        self.fail_after = fail_after;
        self
    }
}

#[async_trait]
impl DocCursor for MockCursor {
    async fn advance(&mut self) -> trawl_docstore::Result<bool> {
        if self.closed {
            return Err(StoreError::cursor("cursor already closed"));
        }
        if let Some((n, message)) = &self.fail_after {
            if self.advances >= *n {
                return Err(StoreError::cursor(message.clone()));
            }
        }
        self.advances += 1;
        match self.remaining.next() {
            Some(document) => {
                self.current = Some(document);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn current(&self) -> trawl_docstore::Result<Row> {
        self.current
            .clone()
            .map(Row::from_document)
            .ok_or_else(|| StoreError::cursor("no current document"))
    }

    async fn close(&mut self) -> trawl_docstore::Result<()> {
        self.closed = true;
        self.current = None;
        self.remaining = Vec::new().into_iter();
        Ok(())
    }
}

/// Create test rows quickly
pub mod rows {
    use serde_json::{json, Value};

    /// Documents `{"_id": "id-0", "seq": 0}` through `count - 1`
    pub fn sequential(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({"_id": format!("id-{i}"), "seq": i}))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_plays_back_rows() {
        let mut connector = MockConnector::new().with_rows(vec![
            json!({"_id": "a1"}),
            json!({"_id": "b2"}),
        ]);

        let stream = connector.get_data("{}", "products").await.unwrap();
        let mut ids = Vec::new();
        while let Some(row) = stream.lock().await.next().await.unwrap() {
            ids.push(row.get_str("_id").unwrap().to_string());
        }
        assert_eq!(ids, vec!["a1", "b2"]);
    }

    #[tokio::test]
    async fn test_probe_records_issued_commands() {
        let mut connector = MockConnector::new().with_rows(rows::sequential(1));
        let probe = connector.probe();

        connector
            .get_data(r#"{"qty": {"$gt": 5}}"#, "products")
            .await
            .unwrap();

        assert_eq!(probe.issued_count(), 1);
        assert_eq!(
            probe.issued(),
            vec![IssuedCommand {
                command: r#"{"qty": {"$gt": 5}}"#.to_string(),
                collection: "products".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_scripted_get_data_failure() {
        let mut connector = MockConnector::new().fail_get_data_with("index rebuild in progress");
        let probe = connector.probe();

        let err = connector.get_data("{}", "products").await.unwrap_err();
        assert!(matches!(err, ConnectorError::Query(_)));
        assert_eq!(probe.issued_count(), 0);
    }

    #[tokio::test]
    async fn test_scripted_fault_respects_policy() {
        let mut connector = MockConnector::new()
            .with_rows(rows::sequential(3))
            .fail_advance_after(1, "socket reset")
            .with_policy(CursorErrorPolicy::Propagate);

        let stream = connector.get_data("{}", "products").await.unwrap();
        assert!(stream.lock().await.next().await.unwrap().is_some());
        let err = stream.lock().await.next().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Query(_)));
    }

    #[tokio::test]
    async fn test_second_get_data_releases_previous() {
        let mut connector = MockConnector::new().with_rows(rows::sequential(2));
        let probe = connector.probe();

        let first = connector.get_data("{}", "products").await.unwrap();
        connector.get_data("{}", "products").await.unwrap();

        assert!(!first.lock().await.is_open());
        assert_eq!(probe.close_count(), 1);
    }

    #[tokio::test]
    async fn test_close_counts_releases_once() {
        let mut connector = MockConnector::new().with_rows(rows::sequential(1));
        let probe = connector.probe();

        connector.get_data("{}", "products").await.unwrap();
        connector.close().await;
        connector.close().await;

        assert_eq!(probe.close_count(), 1);
    }

    #[test]
    fn test_rows_helper() {
        let rows = rows::sequential(3);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["_id"], "id-2");
        assert_eq!(rows[2]["seq"], 2);
    }
}
