//! Filter parsing and matching for trawl-docstore
//!
//! Commands arrive as one string of JSON-like filter notation (the store's
//! textual query format). [`parse_filter`] turns that text into a filter
//! document; backends translate the document into their native representation.
//!
//! [`matches_filter`] is a deliberately small evaluator used by the in-memory
//! backend: top-level equality plus the comparison operators incremental
//! commands rely on (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$exists`). Anything fancier belongs to a real server-side backend.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::Document;

/// Parse filter text into a filter document
///
/// Blank input parses to the empty filter (match-all), which is what an
/// entity with no configured command issues.
pub fn parse_filter(text: &str) -> Result<Document> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Document::new());
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| Error::query_with_filter(format!("malformed filter: {e}"), trimmed))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::query_with_filter(
            format!("filter must be a document, got {}", type_name(&other)),
            trimmed,
        )),
    }
}

/// Evaluate a filter document against a stored document
///
/// Every top-level filter field must match for the document to match. A
/// condition whose value is an object with `$`-prefixed keys is an operator
/// document; any other condition value is compared for literal equality.
pub fn matches_filter(document: &Document, filter: &Document) -> Result<bool> {
    for (field, condition) in filter {
        if !matches_condition(document.get(field), condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_condition(actual: Option<&Value>, condition: &Value) -> Result<bool> {
    if let Value::Object(ops) = condition {
        if ops.keys().any(|k| k.starts_with('$')) {
            return matches_operators(actual, ops);
        }
    }
    // Literal comparison, including nested documents compared wholesale.
    Ok(actual == Some(condition))
}

fn matches_operators(actual: Option<&Value>, ops: &Document) -> Result<bool> {
    for (op, operand) in ops {
        let hit = match op.as_str() {
            "$eq" => actual == Some(operand),
            "$ne" => actual != Some(operand),
            "$gt" => compare(actual, operand).is_some_and(|o| o == Ordering::Greater),
            "$gte" => compare(actual, operand).is_some_and(|o| o != Ordering::Less),
            "$lt" => compare(actual, operand).is_some_and(|o| o == Ordering::Less),
            "$lte" => compare(actual, operand).is_some_and(|o| o != Ordering::Greater),
            "$in" => match operand {
                Value::Array(candidates) => {
                    actual.is_some_and(|a| candidates.iter().any(|c| c == a))
                }
                _ => {
                    return Err(Error::query(format!(
                        "$in requires an array operand, got {}",
                        type_name(operand)
                    )))
                }
            },
            "$exists" => {
                let wanted = operand.as_bool().ok_or_else(|| {
                    Error::query(format!(
                        "$exists requires a boolean operand, got {}",
                        type_name(operand)
                    ))
                })?;
                actual.is_some() == wanted
            }
            other => {
                return Err(Error::unsupported(format!(
                    "filter operator {other} is not supported by this backend"
                )))
            }
        };
        if !hit {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Order two values when they are of a comparable kind
///
/// Numbers compare numerically, strings lexicographically. An absent field or
/// a cross-kind comparison yields no ordering, which fails range operators
/// the way the store itself skips non-comparable documents.
fn compare(actual: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (actual?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "document",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_blank_is_match_all() {
        assert!(parse_filter("").unwrap().is_empty());
        assert!(parse_filter("   ").unwrap().is_empty());
        assert!(parse_filter("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_filter_document() {
        let filter = parse_filter(r#"{"status": "active", "qty": {"$gt": 5}}"#).unwrap();
        assert_eq!(filter.get("status"), Some(&json!("active")));
        assert_eq!(filter.get("qty"), Some(&json!({"$gt": 5})));
    }

    #[test]
    fn test_parse_malformed_filter() {
        let err = parse_filter("{status:").unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
        assert!(err.to_string().contains("malformed filter"));
    }

    #[test]
    fn test_parse_non_document_filter() {
        let err = parse_filter("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("must be a document"));
    }

    #[test]
    fn test_match_all() {
        let document = doc(json!({"a": 1}));
        assert!(matches_filter(&document, &Document::new()).unwrap());
    }

    #[test]
    fn test_equality_match() {
        let document = doc(json!({"status": "active", "qty": 7}));
        assert!(matches_filter(&document, &doc(json!({"status": "active"}))).unwrap());
        assert!(!matches_filter(&document, &doc(json!({"status": "retired"}))).unwrap());
        assert!(!matches_filter(&document, &doc(json!({"missing": 1}))).unwrap());
    }

    #[test]
    fn test_nested_literal_equality() {
        let document = doc(json!({"dims": {"w": 2, "h": 3}}));
        assert!(matches_filter(&document, &doc(json!({"dims": {"w": 2, "h": 3}}))).unwrap());
        assert!(!matches_filter(&document, &doc(json!({"dims": {"w": 2}}))).unwrap());
    }

    #[test]
    fn test_range_operators() {
        let document = doc(json!({"qty": 7, "name": "widget"}));
        assert!(matches_filter(&document, &doc(json!({"qty": {"$gt": 5}}))).unwrap());
        assert!(matches_filter(&document, &doc(json!({"qty": {"$gte": 7}}))).unwrap());
        assert!(matches_filter(&document, &doc(json!({"qty": {"$lt": 8}}))).unwrap());
        assert!(!matches_filter(&document, &doc(json!({"qty": {"$lte": 6}}))).unwrap());
        assert!(matches_filter(&document, &doc(json!({"name": {"$gt": "m"}}))).unwrap());
        // Cross-kind ranges never match.
        assert!(!matches_filter(&document, &doc(json!({"name": {"$gt": 5}}))).unwrap());
    }

    #[test]
    fn test_in_and_exists() {
        let document = doc(json!({"status": "active"}));
        assert!(matches_filter(&document, &doc(json!({"status": {"$in": ["active", "new"]}})))
            .unwrap());
        assert!(!matches_filter(&document, &doc(json!({"status": {"$in": ["retired"]}}))).unwrap());
        assert!(matches_filter(&document, &doc(json!({"status": {"$exists": true}}))).unwrap());
        assert!(matches_filter(&document, &doc(json!({"gone": {"$exists": false}}))).unwrap());
        assert!(!matches_filter(&document, &doc(json!({"gone": {"$exists": true}}))).unwrap());
    }

    #[test]
    fn test_ne_on_missing_field() {
        let document = doc(json!({"a": 1}));
        assert!(matches_filter(&document, &doc(json!({"b": {"$ne": 2}}))).unwrap());
    }

    #[test]
    fn test_unsupported_operator() {
        let document = doc(json!({"a": 1}));
        let err = matches_filter(&document, &doc(json!({"a": {"$regex": "x"}}))).unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn test_in_requires_array() {
        let document = doc(json!({"a": 1}));
        let err = matches_filter(&document, &doc(json!({"a": {"$in": 3}}))).unwrap_err();
        assert!(err.to_string().contains("$in requires an array"));
    }
}
