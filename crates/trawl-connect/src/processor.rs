//! Per-entity streaming processor
//!
//! [`EntityProcessor`] drives one logical entity through an import run. It
//! selects the command for the run mode, issues it through the shared
//! connector exactly once, then pulls rows one at a time until the stream
//! runs dry. The lifecycle is strictly forward:
//!
//! ```text
//! Uninitialized -> init -> Ready -> first next_row -> Streaming -> Exhausted
//! ```
//!
//! There is no way back from `Exhausted` within one run; a fresh run
//! re-initializes the processor.

use std::sync::Arc;

use tracing::{debug, warn};

use trawl_docstore::Row;

use crate::config::EntityConfig;
use crate::connector::SharedConnector;
use crate::context::{EntityContext, RunMode};
use crate::error::{ConnectorError, ConnectorResult};
use crate::metrics::ImportMetrics;
use crate::stream::SharedRowStream;

/// Lifecycle of one processor across a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Constructed, `init` not called yet
    Uninitialized,
    /// Initialized, no query issued yet
    Ready,
    /// Query issued, rows being pulled
    Streaming,
    /// Stream ran dry
    Exhausted,
}

/// Streaming processor for one entity
pub struct EntityProcessor {
    name: String,
    config: EntityConfig,
    metrics: Arc<ImportMetrics>,
    context: Option<EntityContext>,
    connector: Option<SharedConnector>,
    stream: Option<SharedRowStream>,
    state: ProcessorState,
}

impl std::fmt::Debug for EntityProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityProcessor")
            .field("name", &self.name)
            .field("collection", &self.config.collection)
            .field("state", &self.state)
            .finish()
    }
}

impl EntityProcessor {
    /// Create a processor for one entity
    ///
    /// The processor starts out [`ProcessorState::Uninitialized`]; call
    /// [`init`](Self::init) with the run context and a connector before
    /// pulling rows.
    pub fn new(
        name: impl Into<String>,
        config: EntityConfig,
        metrics: Arc<ImportMetrics>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            metrics,
            context: None,
            connector: None,
            stream: None,
            state: ProcessorState::Uninitialized,
        }
    }

    /// Entity name this processor serves
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Bind the run context and connector, moving to [`ProcessorState::Ready`]
    ///
    /// Fails with a configuration error when the entity has no collection
    /// name. Re-initializing after a finished run starts a fresh cycle; any
    /// previous stream reference is dropped (the connector releases the
    /// cursor itself when the next command is issued).
    pub fn init(
        &mut self,
        context: EntityContext,
        connector: SharedConnector,
    ) -> ConnectorResult<()> {
        if self.config.collection.trim().is_empty() {
            return Err(ConnectorError::config(format!(
                "entity '{}': collection is required",
                self.name
            )));
        }

        debug!(
            entity = %self.name,
            collection = %self.config.collection,
            mode = %context.mode,
            "processor initialized"
        );

        self.context = Some(context);
        self.connector = Some(connector);
        self.stream = None;
        self.state = ProcessorState::Ready;
        Ok(())
    }

    /// Select the command for the current run mode
    ///
    /// FULL runs use the primary command. DELTA runs use the delta command
    /// when one is configured; otherwise the primary command is used and a
    /// warning is logged, since that re-imports everything.
    pub fn command(&self) -> &str {
        let mode = self.context.as_ref().map(|c| c.mode);
        match mode {
            Some(RunMode::Delta) => match &self.config.delta_command {
                Some(delta) => delta,
                None => {
                    warn!(
                        entity = %self.name,
                        "delta mode with no delta command configured, falling back to primary command"
                    );
                    &self.config.command
                }
            },
            _ => &self.config.command,
        }
    }

    /// Pull the next row, issuing the query on the first call
    ///
    /// Returns `Ok(None)` once the stream is exhausted and on every call
    /// after that. The shared query counter is incremented exactly once per
    /// query issued, not per row.
    pub async fn next_row(&mut self) -> ConnectorResult<Option<Row>> {
        match self.state {
            ProcessorState::Uninitialized => Err(ConnectorError::config(format!(
                "entity '{}': next_row called before init",
                self.name
            ))),
            ProcessorState::Ready => {
                let stream = self.issue_query().await?;
                self.stream = Some(stream);
                self.state = ProcessorState::Streaming;
                self.pull().await
            }
            ProcessorState::Streaming => self.pull().await,
            ProcessorState::Exhausted => Ok(None),
        }
    }

    /// Issue the run's query through the connector
    ///
    /// On failure the processor stays Ready, so the caller may retry after
    /// fixing whatever rejected the command.
    async fn issue_query(&mut self) -> ConnectorResult<SharedRowStream> {
        let context = self.context.as_ref().ok_or_else(|| {
            ConnectorError::config(format!("entity '{}': missing run context", self.name))
        })?;
        let connector = self.connector.as_ref().ok_or_else(|| {
            ConnectorError::config(format!("entity '{}': missing connector", self.name))
        })?;

        let command = context.resolve_tokens(self.command(), None);
        let stream = connector
            .lock()
            .await
            .get_data(&command, &self.config.collection)
            .await?;
        self.metrics.record_query();

        debug!(entity = %self.name, "query issued, streaming");
        Ok(stream)
    }

    async fn pull(&mut self) -> ConnectorResult<Option<Row>> {
        let stream = match &self.stream {
            Some(stream) => Arc::clone(stream),
            None => {
                self.state = ProcessorState::Exhausted;
                return Ok(None);
            }
        };

        let row = stream.lock().await.next().await?;
        if row.is_none() {
            self.state = ProcessorState::Exhausted;
            self.stream = None;
            debug!(entity = %self.name, "stream exhausted");
        }
        Ok(row)
    }
}
