//! Core value types for trawl-docstore
//!
//! Documents fetched from a store surface as [`Row`]: a field-name to value
//! mapping carried verbatim, with no schema and no type coercion. Values are
//! opaque `serde_json::Value`s; the pipeline decides downstream what to make
//! of them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless document as stored: field name to opaque value
pub type Document = Map<String, Value>;

/// One fetched document, shallow-copied into a field-name to value mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Document);

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Create a row from an existing document, copying every field verbatim
    pub fn from_document(document: Document) -> Self {
        Self(document)
    }

    /// Get a field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Get a field as a string slice, if it is a string
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Get a field as an i64, if it is an integral number
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    /// Whether the row carries the named field
    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Insert or replace a field, returning the previous value if any
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field, returning its value if present
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Number of fields in the row
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over field name/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consume the row, yielding the underlying document
    pub fn into_document(self) -> Document {
        self.0
    }
}

impl From<Document> for Row {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Row {
        let mut row = Row::new();
        row.insert("_id", json!("abc123"));
        row.insert("name", json!("widget"));
        row.insert("qty", json!(7));
        row
    }

    #[test]
    fn test_row_get() {
        let row = sample();
        assert_eq!(row.get_str("_id"), Some("abc123"));
        assert_eq!(row.get_i64("qty"), Some(7));
        assert_eq!(row.get("missing"), None);
        assert!(row.contains_field("name"));
    }

    #[test]
    fn test_row_insert_replaces() {
        let mut row = sample();
        let old = row.insert("qty", json!(8));
        assert_eq!(old, Some(json!(7)));
        assert_eq!(row.get_i64("qty"), Some(8));
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_row_preserves_key_set() {
        let document: Document = json!({"_id": 1, "nested": {"a": [1, 2]}, "flag": true})
            .as_object()
            .cloned()
            .unwrap();
        let row = Row::from_document(document.clone());

        let mut expected: Vec<_> = document.keys().cloned().collect();
        let mut actual: Vec<_> = row.field_names().map(String::from).collect();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
        assert_eq!(row.get("nested"), Some(&json!({"a": [1, 2]})));
    }

    #[test]
    fn test_row_serde_transparent() {
        let row = sample();
        let encoded = serde_json::to_string(&row).unwrap();
        let decoded: Row = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, row);
        assert!(encoded.starts_with('{'));
    }
}
