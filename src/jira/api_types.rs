//! Serde-deserializable envelopes for Jira API responses.
//!
//! Only paging metadata is typed; the payloads themselves stay as raw JSON and
//! become records later.

use serde::Deserialize;
use serde_json::{json, Map, Value};

/// One page of `/rest/agile/1.0/board/{id}/sprint`.
#[derive(Debug, Deserialize)]
pub struct ApiSprintPage {
  #[serde(default)]
  pub values: Vec<Value>,
  #[serde(rename = "startAt", default)]
  pub start_at: u64,
  #[serde(rename = "isLast", default)]
  pub is_last: bool,
}

impl ApiSprintPage {
  /// Whether another page should be requested after this one.
  pub fn has_more(&self) -> bool {
    !self.is_last && !self.values.is_empty()
  }

  /// Offset of the page after this one.
  pub fn next_start(&self) -> u64 {
    self.start_at + self.values.len() as u64
  }
}

/// Issue payload in the shape `issue_record` expects.
pub fn issue_payload(key: String, id: String, fields: impl IntoIterator<Item = (String, Value)>) -> Value {
  let fields: Map<String, Value> = fields.into_iter().collect();
  json!({
    "key": key,
    "id": id,
    "fields": fields,
  })
}

/// Sprint state as reported by the agile API.
pub fn sprint_state(sprint: &Value) -> Option<&str> {
  sprint.get("state").and_then(Value::as_str)
}

pub fn sprint_name(sprint: &Value) -> &str {
  sprint.get("name").and_then(Value::as_str).unwrap_or("")
}
