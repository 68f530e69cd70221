//! MongoDB backend implementation for trawl-docstore
//!
//! Binds the session traits to the official async driver:
//! - Session open with eager reachability/credential verification
//! - Filter conversion (Extended-JSON-aware) into BSON
//! - Cursor adaptation with per-fetch timeout

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document as BsonDocument};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Cursor};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::{DocCursor, DocSession, SessionConfig, SessionFactory, StoreKind};
use crate::types::{Document, Row};

/// Convert a parsed filter document into the driver's BSON representation
///
/// Goes through the Extended JSON interpretation so constructs like
/// `{"$oid": "..."}` become their native types, while operator documents
/// (`{"$gt": 5}`) pass through untouched.
fn filter_to_bson(filter: &Document) -> Result<BsonDocument> {
    let mut out = BsonDocument::new();
    for (field, value) in filter {
        let bson = Bson::try_from(value.clone()).map_err(|e| {
            Error::type_conversion(format!("filter field {field} is not convertible: {e}"))
        })?;
        out.insert(field, bson);
    }
    Ok(out)
}

/// Render a BSON value as loose JSON
///
/// Relaxed Extended JSON keeps plain types plain; store-specific types
/// (object ids, dates) keep a readable wrapped form.
fn bson_to_json(value: Bson) -> Value {
    value.into_relaxed_extjson()
}

/// Copy a fetched BSON document into a row, field by field
fn document_to_row(document: BsonDocument) -> Row {
    document
        .into_iter()
        .map(|(field, value)| (field, bson_to_json(value)))
        .collect()
}

/// Build the connection URI, percent-encoding credentials when present
fn build_uri(config: &SessionConfig) -> Result<url::Url> {
    let mut uri = url::Url::parse(&format!(
        "mongodb://{}:{}/{}",
        config.host, config.port, config.database
    ))
    .map_err(|e| Error::config(format!("invalid store endpoint: {e}")))?;

    if let Some(username) = &config.username {
        uri.set_username(username)
            .map_err(|_| Error::config("invalid username for store endpoint"))?;
        uri.set_password(config.password.as_deref())
            .map_err(|_| Error::config("invalid password for store endpoint"))?;
    }
    Ok(uri)
}

fn classify_connection_error(context: &str, err: mongodb::error::Error) -> Error {
    if matches!(*err.kind, ErrorKind::Authentication { .. }) {
        Error::authentication(format!("{context}: {err}"))
    } else {
        Error::connection_with_source(context.to_string(), err)
    }
}

/// MongoDB-backed session bound to one database
#[derive(Debug)]
pub struct MongoSession {
    client: Client,
    database: String,
    fetch_timeout: Option<Duration>,
}

#[async_trait]
impl DocSession for MongoSession {
    async fn open_cursor(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Box<dyn DocCursor>> {
        let bson_filter = filter_to_bson(filter)?;
        debug!(collection = %collection, "opening cursor");

        // The collection handle is resolved per call; nothing is cached.
        let handle = self
            .client
            .database(&self.database)
            .collection::<BsonDocument>(collection);

        let cursor = handle
            .find(bson_filter)
            .await
            .map_err(|e| Error::query_with_source("failed to open cursor", e))?;

        Ok(Box::new(MongoCursor {
            inner: Some(cursor),
            fetch_timeout: self.fetch_timeout,
        }))
    }

    async fn ping(&self) -> Result<()> {
        debug!(database = %self.database, "pinging store");
        self.client
            .database(&self.database)
            .run_command(doc! {"ping": 1})
            .await
            .map(|_| ())
            .map_err(|e| classify_connection_error("ping failed", e))
    }

    fn database(&self) -> &str {
        &self.database
    }
}

/// Cursor adapter over the driver's batched cursor
#[derive(Debug)]
pub struct MongoCursor {
    inner: Option<Cursor<BsonDocument>>,
    fetch_timeout: Option<Duration>,
}

#[async_trait]
impl DocCursor for MongoCursor {
    async fn advance(&mut self) -> Result<bool> {
        let limit = self.fetch_timeout;
        let cursor = self
            .inner
            .as_mut()
            .ok_or_else(|| Error::cursor("cursor already closed"))?;

        let advanced = match limit {
            Some(limit) => tokio::time::timeout(limit, cursor.advance())
                .await
                .map_err(|_| {
                    Error::timeout(format!("cursor fetch exceeded {}ms", limit.as_millis()))
                })?,
            None => cursor.advance().await,
        };

        advanced.map_err(|e| Error::cursor_with_source("cursor advance failed", e))
    }

    fn current(&self) -> Result<Row> {
        let cursor = self
            .inner
            .as_ref()
            .ok_or_else(|| Error::cursor("cursor already closed"))?;
        let document = cursor
            .deserialize_current()
            .map_err(|e| Error::cursor_with_source("failed to decode current document", e))?;
        Ok(document_to_row(document))
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the driver cursor releases the server-side resource.
        self.inner = None;
        Ok(())
    }
}

/// Factory opening MongoDB sessions
pub struct MongoSessionFactory;

#[async_trait]
impl SessionFactory for MongoSessionFactory {
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn DocSession>> {
        config.validate()?;

        let uri = build_uri(config)?;
        let mut options = ClientOptions::parse(uri.as_str())
            .await
            .map_err(|e| Error::connection_with_source("invalid store endpoint", e))?;
        options.app_name = config.application_name.clone();
        if config.connect_timeout_ms > 0 {
            let limit = Duration::from_millis(config.connect_timeout_ms);
            options.connect_timeout = Some(limit);
            options.server_selection_timeout = Some(limit);
        }

        let client = Client::with_options(options)
            .map_err(|e| Error::connection_with_source("failed to build store client", e))?;

        let session = MongoSession {
            client,
            database: config.database.clone(),
            fetch_timeout: (config.fetch_timeout_ms > 0)
                .then(|| Duration::from_millis(config.fetch_timeout_ms)),
        };

        // The driver connects lazily; a ping verifies reachability and, when
        // credentials are configured, exercises authentication eagerly.
        session.ping().await?;

        Ok(Box::new(session))
    }

    fn store_kind(&self) -> StoreKind {
        StoreKind::MongoDb
    }
}

/// Open a MongoDB session with the given configuration
pub async fn connect(config: &SessionConfig) -> Result<Box<dyn DocSession>> {
    MongoSessionFactory.open(config).await
}
