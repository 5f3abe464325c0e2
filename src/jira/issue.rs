//! Turning raw issue payloads into records.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::{DynamicRecord, Node};

/// Timestamp fields normalized to RFC 3339.
const TIMESTAMP_FIELDS: &[&str] = &["lastViewed", "created", "updated"];

/// Build an issue record from `{ "key", "id", "fields" }`.
///
/// The record holds the issue's fields at the top level plus:
/// - `key`: canonical issue key
/// - `id`: numeric id when the upstream id is numeric
/// - `subtasks`: always an array of records
/// - `lastViewed`, `created`, `updated`: RFC 3339 strings, or null when missing
///   or unparseable
pub fn issue_record(raw: Value) -> Result<DynamicRecord> {
  let Value::Object(mut raw) = raw else {
    return Err(Error::Argument("issue payload is not a JSON object".to_string()));
  };

  let mut record = match raw.remove("fields") {
    Some(fields @ Value::Object(_)) => DynamicRecord::from_value(fields)?,
    Some(Value::Null) | None => DynamicRecord::new(),
    Some(_) => {
      return Err(Error::Argument(
        "issue fields are not a JSON object".to_string(),
      ))
    }
  };

  if !matches!(record.get("subtasks"), Some(Node::Array(_))) {
    record.set("subtasks", Vec::<Node>::new());
  }

  let key = raw.remove("key").map(Node::from_value).unwrap_or(Node::Null);
  record.set("key", key);

  let id = match raw.remove("id") {
    Some(id) => {
      let node = Node::from_value(id);
      match node.as_u64() {
        Some(n) => Node::from(n),
        None => node,
      }
    }
    None => Node::Null,
  };
  record.set("id", id);

  normalize_timestamps(&mut record);
  Ok(record)
}

fn normalize_timestamps(record: &mut DynamicRecord) {
  for field in TIMESTAMP_FIELDS {
    let normalized = record
      .datetime(field)
      .map(|dt| Node::from(dt.to_rfc3339()))
      .unwrap_or(Node::Null);
    record.set(*field, normalized);
  }
}
