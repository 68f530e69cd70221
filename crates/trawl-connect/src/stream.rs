//! Lazy row stream over a store cursor
//!
//! A [`RowStream`] adapts one open cursor into a forward-only sequence of
//! rows, pulled one at a time. It owns the cursor exclusively: normal
//! exhaustion and driver faults both release it, and [`RowStream::close`] is
//! take-based so repeated calls are no-ops.
//!
//! How a mid-stream driver fault is surfaced is chosen per store by
//! [`CursorErrorPolicy`]: degrade to end-of-stream with a logged warning, or
//! propagate a query error to the caller.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use trawl_docstore::session::DocCursor;
use trawl_docstore::Row;

use crate::error::ConnectorResult;
use crate::metrics::ImportMetrics;

/// How a driver fault during a pull is surfaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CursorErrorPolicy {
    /// Log a warning and end the stream early
    #[default]
    EndOfStream,
    /// Surface the fault as a query error
    Propagate,
}

/// A row stream shared between the connector's cursor slot and its consumer
pub type SharedRowStream = Arc<Mutex<RowStream>>;

/// Lazy, finite, non-restartable sequence of rows over one cursor
pub struct RowStream {
    cursor: Option<Box<dyn DocCursor>>,
    policy: CursorErrorPolicy,
    metrics: Arc<ImportMetrics>,
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("open", &self.cursor.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RowStream {
    /// Wrap an open cursor
    pub fn new(
        cursor: Box<dyn DocCursor>,
        policy: CursorErrorPolicy,
        metrics: Arc<ImportMetrics>,
    ) -> Self {
        Self {
            cursor: Some(cursor),
            policy,
            metrics,
        }
    }

    /// Move the stream behind a shared handle
    pub fn into_shared(self) -> SharedRowStream {
        Arc::new(Mutex::new(self))
    }

    /// Whether the underlying cursor is still open
    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Pull the next row
    ///
    /// `Ok(None)` signals the end of the stream; the cursor is released at
    /// that point. A driver fault also releases the cursor and then follows
    /// the configured [`CursorErrorPolicy`].
    pub async fn next(&mut self) -> ConnectorResult<Option<Row>> {
        match self.pull().await {
            Ok(Some(row)) => {
                self.metrics.record_row();
                Ok(Some(row))
            }
            Ok(None) => {
                self.close().await;
                Ok(None)
            }
            Err(error) => {
                self.metrics.record_cursor_fault();
                self.close().await;
                match self.policy {
                    CursorErrorPolicy::EndOfStream => {
                        warn!(error = %error, "cursor fault during pull, ending stream");
                        Ok(None)
                    }
                    CursorErrorPolicy::Propagate => Err(error.into()),
                }
            }
        }
    }

    /// One probe against the cursor; `Ok(None)` is normal exhaustion
    async fn pull(&mut self) -> trawl_docstore::Result<Option<Row>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        if cursor.advance().await? {
            Ok(Some(cursor.current()?))
        } else {
            Ok(None)
        }
    }

    /// Release the cursor
    ///
    /// Best-effort: a failure during release is logged, never re-raised. The
    /// slot is cleared either way, so calling this again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(error) = cursor.close().await {
                warn!(error = %error, "cursor release failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::error::ConnectorError;
    use trawl_docstore::memory::{MemorySessionFactory, MemoryStore};
    use trawl_docstore::session::{SessionConfig, SessionFactory};
    use trawl_docstore::types::Document;

    fn seeded() -> MemoryStore {
        MemoryStore::new().with_collection(
            "items",
            vec![
                json!({"_id": "a1", "name": "anvil"}),
                json!({"_id": "b2", "name": "bolt"}),
                json!({"_id": "c3", "name": "crate"}),
            ],
        )
    }

    async fn stream_over(
        store: &MemoryStore,
        policy: CursorErrorPolicy,
        metrics: &Arc<ImportMetrics>,
    ) -> RowStream {
        let session = MemorySessionFactory::new(store.clone())
            .open(&SessionConfig::new("catalog"))
            .await
            .unwrap();
        let cursor = session.open_cursor("items", &Document::new()).await.unwrap();
        RowStream::new(cursor, policy, Arc::clone(metrics))
    }

    #[tokio::test]
    async fn test_yields_all_rows_then_releases_cursor() {
        let store = seeded();
        let metrics = Arc::new(ImportMetrics::new());
        let mut stream = stream_over(&store, CursorErrorPolicy::EndOfStream, &metrics).await;

        let mut ids = Vec::new();
        while let Some(row) = stream.next().await.unwrap() {
            ids.push(row.get_str("_id").unwrap().to_string());
        }

        assert_eq!(ids, vec!["a1", "b2", "c3"]);
        assert!(!stream.is_open());
        assert_eq!(store.live_cursors(), 0);
        assert_eq!(metrics.snapshot().rows_emitted, 3);
    }

    #[tokio::test]
    async fn test_exhausted_stream_stays_exhausted() {
        let store = seeded();
        let metrics = Arc::new(ImportMetrics::new());
        let mut stream = stream_over(&store, CursorErrorPolicy::EndOfStream, &metrics).await;

        while stream.next().await.unwrap().is_some() {}
        assert!(stream.next().await.unwrap().is_none());
        assert!(stream.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fault_degrades_to_end_of_stream() {
        let store = seeded().fail_advance_after(1, "socket reset");
        let metrics = Arc::new(ImportMetrics::new());
        let mut stream = stream_over(&store, CursorErrorPolicy::EndOfStream, &metrics).await;

        assert!(stream.next().await.unwrap().is_some());
        assert!(stream.next().await.unwrap().is_none());

        assert_eq!(metrics.snapshot().cursor_faults, 1);
        assert_eq!(store.live_cursors(), 0);
    }

    #[tokio::test]
    async fn test_fault_propagates_when_configured() {
        let store = seeded().fail_advance_after(1, "socket reset");
        let metrics = Arc::new(ImportMetrics::new());
        let mut stream = stream_over(&store, CursorErrorPolicy::Propagate, &metrics).await;

        assert!(stream.next().await.unwrap().is_some());
        let err = stream.next().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Query(_)), "got: {:?}", err);

        assert_eq!(metrics.snapshot().cursor_faults, 1);
        assert!(!stream.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = seeded();
        let metrics = Arc::new(ImportMetrics::new());
        let mut stream = stream_over(&store, CursorErrorPolicy::EndOfStream, &metrics).await;

        stream.close().await;
        stream.close().await;

        assert!(stream.next().await.unwrap().is_none());
        assert_eq!(store.cursors_closed(), 1);
    }

    #[tokio::test]
    async fn test_close_failure_not_raised() {
        let store = seeded().fail_close_with("network gone");
        let metrics = Arc::new(ImportMetrics::new());
        let mut stream = stream_over(&store, CursorErrorPolicy::EndOfStream, &metrics).await;

        stream.close().await;
        assert_eq!(store.cursors_closed(), 1);
    }

    #[test]
    fn test_policy_serde() {
        let policy: CursorErrorPolicy = serde_yaml::from_str("end-of-stream").unwrap();
        assert_eq!(policy, CursorErrorPolicy::EndOfStream);
        let policy: CursorErrorPolicy = serde_yaml::from_str("propagate").unwrap();
        assert_eq!(policy, CursorErrorPolicy::Propagate);
        assert_eq!(CursorErrorPolicy::default(), CursorErrorPolicy::EndOfStream);
    }
}
