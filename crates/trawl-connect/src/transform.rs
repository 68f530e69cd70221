//! Row transforms
//!
//! [`RowTransformer`] is the seam for per-row rewrites applied between the
//! entity processor and the caller: pure functions over one row, selected by
//! configuration through a small [`TransformerRegistry`].
//!
//! The built-in transform is [`IdHashTransformer`], which replaces opaque
//! identifier values with a stable integer hash so downstream systems can
//! join on them without carrying the original identifier around.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use trawl_docstore::Row;

use crate::config::{EntityConfig, FieldConfig};
use crate::context::{value_to_text, EntityContext};
use crate::error::{ConnectorError, ConnectorResult};

/// A pure per-row rewrite
pub trait RowTransformer: Send + Sync {
    /// Transform one row under the given run context
    fn transform(&self, row: Row, context: &EntityContext) -> ConnectorResult<Row>;
}

/// Registry of row transformers keyed by name
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn RowTransformer>>,
}

impl TransformerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Register a transformer under a name
    pub fn register(&mut self, name: &str, transformer: Arc<dyn RowTransformer>) {
        self.transformers.insert(name.to_string(), transformer);
    }

    /// Get a transformer by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn RowTransformer>> {
        self.transformers.get(name)
    }

    /// Check if a transformer is registered
    pub fn contains(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }

    /// Number of registered transformers
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces opaque identifier values with a stable 64-bit integer hash
///
/// The transformer walks every configured field. A field participates when
/// its hint template, token-substituted against the row and context,
/// resolves to `true` (case-insensitive; anything else, including an absent
/// hint, leaves the field untouched). For a participating field, the value
/// at the configured column is replaced with the FNV-1a hash of its
/// canonical text, so the same identifier maps to the same integer across
/// processes and runs.
pub struct IdHashTransformer {
    fields: Vec<FieldConfig>,
}

impl IdHashTransformer {
    /// Create a transformer over the given field configurations
    pub fn new(fields: Vec<FieldConfig>) -> Self {
        Self { fields }
    }

    /// Create a transformer from an entity's configured fields
    pub fn for_entity(config: &EntityConfig) -> Self {
        Self::new(config.fields.clone())
    }
}

impl RowTransformer for IdHashTransformer {
    fn transform(&self, mut row: Row, context: &EntityContext) -> ConnectorResult<Row> {
        for field in &self.fields {
            let Some(hint) = &field.hash_identifier else {
                continue;
            };
            let resolved = context.resolve_tokens(hint, Some(&row));
            if !hint_enabled(&resolved) {
                continue;
            }

            let value = row
                .get(&field.column)
                .ok_or_else(|| ConnectorError::missing_field(&field.column))?;
            let hashed = fnv1a_64(&value_to_text(value));
            row.insert(field.column.clone(), Value::from(hashed));
            debug!(column = %field.column, "identifier hashed");
        }
        Ok(row)
    }
}

/// Read a resolved hint as a boolean; only `true` enables the transform
fn hint_enabled(resolved: &str) -> bool {
    resolved.trim().eq_ignore_ascii_case("true")
}

/// FNV-1a, 64-bit
fn fnv1a_64(text: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
