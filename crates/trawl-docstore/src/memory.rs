//! In-memory document store backend
//!
//! Holds seeded collections in process memory and serves cursors over them by
//! evaluating the filter subset from [`crate::query`]. Used by tests and local
//! runs where no real store is reachable; fault scripting and cursor
//! accounting make lifecycle behavior observable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::matches_filter;
use crate::session::{DocCursor, DocSession, SessionConfig, SessionFactory, StoreKind};
use crate::types::{Document, Row};

/// Shared in-memory store state
///
/// Cloning is cheap; clones observe the same collections, scripts, and
/// counters.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
    fail_ping: Arc<Mutex<Option<String>>>,
    fail_advance_after: Arc<Mutex<Option<(usize, String)>>>,
    fail_close: Arc<Mutex<Option<String>>>,
    cursors_opened: Arc<AtomicUsize>,
    cursors_closed: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("collections", &self.collections.lock().len())
            .field("cursors_opened", &self.cursors_opened())
            .field("cursors_closed", &self.cursors_closed())
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with documents
    ///
    /// Entries that are not JSON documents are ignored; collections hold
    /// documents only.
    pub fn with_collection(self, name: impl Into<String>, documents: Vec<Value>) -> Self {
        let docs = documents
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.collections.lock().insert(name.into(), docs);
        self
    }

    /// Script the next ping calls to fail, simulating rejected credentials
    pub fn fail_ping_with(self, message: impl Into<String>) -> Self {
        *self.fail_ping.lock() = Some(message.into());
        self
    }

    /// Script cursors opened from now on to fail on their n-th advance
    pub fn fail_advance_after(self, n: usize, message: impl Into<String>) -> Self {
        *self.fail_advance_after.lock() = Some((n, message.into()));
        self
    }

    /// Script the next cursor close to fail (release is still recorded)
    pub fn fail_close_with(self, message: impl Into<String>) -> Self {
        *self.fail_close.lock() = Some(message.into());
        self
    }

    /// Number of cursors opened so far
    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    /// Number of cursors released so far (explicit close or drop)
    pub fn cursors_closed(&self) -> usize {
        self.cursors_closed.load(Ordering::SeqCst)
    }

    /// Cursors currently alive
    pub fn live_cursors(&self) -> usize {
        self.cursors_opened() - self.cursors_closed()
    }
}

/// Factory producing sessions over one [`MemoryStore`]
#[derive(Clone, Debug, Default)]
pub struct MemorySessionFactory {
    store: MemoryStore,
}

impl MemorySessionFactory {
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
impl SessionFactory for MemorySessionFactory {
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn DocSession>> {
        config.validate()?;
        Ok(Box::new(MemorySession {
            store: self.store.clone(),
            database: config.database.clone(),
        }))
    }

    fn store_kind(&self) -> StoreKind {
        StoreKind::Memory
    }
}

/// In-memory session bound to one database name
#[derive(Debug)]
pub struct MemorySession {
    store: MemoryStore,
    database: String,
}

#[async_trait]
impl DocSession for MemorySession {
    async fn open_cursor(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Box<dyn DocCursor>> {
        // A missing collection behaves like an empty one, as the store does.
        let documents = self
            .store
            .collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default();

        let mut matched = Vec::new();
        for document in documents {
            if matches_filter(&document, filter)? {
                matched.push(document);
            }
        }

        self.store.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            remaining: matched.into_iter(),
            current: None,
            advances: 0,
            released: false,
            fail_after: self.store.fail_advance_after.lock().clone(),
            fail_close: Arc::clone(&self.store.fail_close),
            closed_counter: Arc::clone(&self.store.cursors_closed),
        }))
    }

    async fn ping(&self) -> Result<()> {
        if let Some(message) = self.store.fail_ping.lock().clone() {
            return Err(Error::authentication(message));
        }
        Ok(())
    }

    fn database(&self) -> &str {
        &self.database
    }
}

/// Cursor over a matched snapshot of one collection
#[derive(Debug)]
pub struct MemoryCursor {
    remaining: std::vec::IntoIter<Document>,
    current: Option<Document>,
    advances: usize,
    released: bool,
    fail_after: Option<(usize, String)>,
    fail_close: Arc<Mutex<Option<String>>>,
    closed_counter: Arc<AtomicUsize>,
}

impl MemoryCursor {
    fn record_release(&mut self) {
        if !self.released {
            self.released = true;
            self.closed_counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DocCursor for MemoryCursor {
    async fn advance(&mut self) -> Result<bool> {
        if self.released {
            return Err(Error::cursor("cursor already closed"));
        }
        if let Some((n, message)) = &self.fail_after {
            if self.advances >= *n {
                return Err(Error::cursor(message.clone()));
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

    fn current(&self) -> Result<Row> {
        self.current
            .clone()
            .map(Row::from_document)
            .ok_or_else(|| Error::cursor("no current document"))
    }

    async fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.record_release();
        self.current = None;
        self.remaining = Vec::new().into_iter();
        if let Some(message) = self.fail_close.lock().take() {
            return Err(Error::cursor(message));
        }
        Ok(())
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        // Dropping releases the cursor, like a driver's kill-on-drop.
        self.record_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> MemoryStore {
        MemoryStore::new().with_collection(
            "products",
            vec![
                json!({"_id": "a1", "name": "anvil", "qty": 3}),
                json!({"_id": "b2", "name": "bolt", "qty": 70}),
                json!({"_id": "c3", "name": "crate", "qty": 12}),
            ],
        )
    }

    async fn open(store: &MemoryStore) -> Box<dyn DocSession> {
        MemorySessionFactory::new(store.clone())
            .open(&SessionConfig::new("catalog"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cursor_yields_matches_in_order() {
        let store = seeded();
        let session = open(&store).await;
        let filter = json!({"qty": {"$gt": 5}}).as_object().cloned().unwrap();
        let mut cursor = session.open_cursor("products", &filter).await.unwrap();

        let mut names = Vec::new();
        while cursor.advance().await.unwrap() {
            names.push(cursor.current().unwrap().get_str("name").unwrap().to_string());
        }
        assert_eq!(names, vec!["bolt", "crate"]);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = seeded();
        let session = open(&store).await;
        let mut cursor = session
            .open_cursor("nope", &Document::new())
            .await
            .unwrap();
        assert!(!cursor.advance().await.unwrap());
    }

    #[tokio::test]
    async fn test_factory_requires_database() {
        let factory = MemorySessionFactory::default();
        let err = factory.open(&SessionConfig::default()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_scripted_ping_failure() {
        let store = seeded().fail_ping_with("bad credentials");
        let session = open(&store).await;
        let err = session.ping().await.unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_scripted_advance_fault() {
        let store = seeded().fail_advance_after(1, "socket reset");
        let session = open(&store).await;
        let mut cursor = session
            .open_cursor("products", &Document::new())
            .await
            .unwrap();

        assert!(cursor.advance().await.unwrap());
        let err = cursor.advance().await.unwrap_err();
        assert!(matches!(err, Error::Cursor { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_counted() {
        let store = seeded();
        let session = open(&store).await;
        let mut cursor = session
            .open_cursor("products", &Document::new())
            .await
            .unwrap();

        cursor.close().await.unwrap();
        cursor.close().await.unwrap();
        drop(cursor);

        assert_eq!(store.cursors_opened(), 1);
        assert_eq!(store.cursors_closed(), 1);
        assert_eq!(store.live_cursors(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_cursor() {
        let store = seeded();
        let session = open(&store).await;
        let cursor = session
            .open_cursor("products", &Document::new())
            .await
            .unwrap();
        drop(cursor);
        assert_eq!(store.live_cursors(), 0);
    }

    #[tokio::test]
    async fn test_advance_after_close_errors() {
        let store = seeded();
        let session = open(&store).await;
        let mut cursor = session
            .open_cursor("products", &Document::new())
            .await
            .unwrap();
        cursor.close().await.unwrap();
        assert!(cursor.advance().await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_close_failure_still_releases() {
        let store = seeded().fail_close_with("network gone");
        let session = open(&store).await;
        let mut cursor = session
            .open_cursor("products", &Document::new())
            .await
            .unwrap();

        assert!(cursor.close().await.is_err());
        // Second close is a no-op success; release was recorded once.
        cursor.close().await.unwrap();
        assert_eq!(store.cursors_closed(), 1);
    }
}
