//! Import run metrics
//!
//! [`ImportMetrics`] is a handle of atomic counters owned by the orchestrator
//! and shared (via `Arc`) with connectors, row streams and entity processors.
//! Counters are incremented where the event happens: a processor records each
//! issued query, a connector each opened stream, a row stream each emitted row
//! and each cursor fault. [`snapshot`](ImportMetrics::snapshot) returns a
//! point-in-time copy for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Import statistics snapshot
#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    /// Queries issued against the store
    pub queries_issued: u64,
    /// Rows handed to the orchestrator
    pub rows_emitted: u64,
    /// Row streams opened
    pub streams_opened: u64,
    /// Driver faults observed during pulls (swallowed or surfaced)
    pub cursor_faults: u64,
    /// Average rows per issued query
    pub avg_rows_per_query: f64,
}

/// Atomic import counters
#[derive(Debug, Default)]
#[allow(missing_docs)]
pub struct ImportMetrics {
    pub queries_issued: AtomicU64,
    pub rows_emitted: AtomicU64,
    pub streams_opened: AtomicU64,
    pub cursor_faults: AtomicU64,
}

impl ImportMetrics {
    /// Create a zeroed handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one issued query
    pub fn record_query(&self) {
        self.queries_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one opened row stream
    pub fn record_stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one emitted row
    pub fn record_row(&self) {
        self.rows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one cursor fault
    pub fn record_cursor_fault(&self) {
        self.cursor_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot
    pub fn snapshot(&self) -> ImportStats {
        let queries = self.queries_issued.load(Ordering::Relaxed);
        let rows = self.rows_emitted.load(Ordering::Relaxed);
        let avg = if queries > 0 {
            rows as f64 / queries as f64
        } else {
            0.0
        };

        ImportStats {
            queries_issued: queries,
            rows_emitted: rows,
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            cursor_faults: self.cursor_faults.load(Ordering::Relaxed),
            avg_rows_per_query: avg,
        }
    }
}
