//! Schema-less records built from arbitrary JSON.
//!
//! Jira payloads carry custom fields whose names and shapes differ from site to
//! site, so instead of mirroring them in structs every attribute lives in a
//! [`Node`] tree with explicit accessors. A record can always be flattened back
//! into a plain JSON object, which is what gets written to the cache.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// A single attribute value inside a [`DynamicRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
  Null,
  Bool(bool),
  Number(Number),
  String(String),
  Array(Vec<Node>),
  Record(DynamicRecord),
}

impl Node {
  /// Wrap a JSON value, turning every nested object into a record.
  pub fn from_value(value: Value) -> Self {
    match value {
      Value::Null => Node::Null,
      Value::Bool(b) => Node::Bool(b),
      Value::Number(n) => Node::Number(n),
      Value::String(s) => Node::String(s),
      Value::Array(items) => Node::Array(items.into_iter().map(Node::from_value).collect()),
      Value::Object(map) => Node::Record(DynamicRecord::from_map(map)),
    }
  }

  /// Convert back into plain JSON.
  pub fn to_value(&self) -> Value {
    match self {
      Node::Null => Value::Null,
      Node::Bool(b) => Value::Bool(*b),
      Node::Number(n) => Value::Number(n.clone()),
      Node::String(s) => Value::String(s.clone()),
      Node::Array(items) => Value::Array(items.iter().map(Node::to_value).collect()),
      Node::Record(record) => Value::Object(record.flatten().clone()),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Node::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Node::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// Numbers, and strings holding a number (Jira sends ids as strings).
  pub fn as_u64(&self) -> Option<u64> {
    match self {
      Node::Number(n) => n.as_u64(),
      Node::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  pub fn as_record(&self) -> Option<&DynamicRecord> {
    match self {
      Node::Record(record) => Some(record),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Node]> {
    match self {
      Node::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
    self.as_str().and_then(parse_timestamp)
  }
}

impl fmt::Display for Node {
  /// Strings are written bare, everything else as compact JSON.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Node::String(s) => f.write_str(s),
      Node::Null => Ok(()),
      other => write!(f, "{}", other.to_value()),
    }
  }
}

impl From<Value> for Node {
  fn from(value: Value) -> Self {
    Node::from_value(value)
  }
}

impl From<bool> for Node {
  fn from(b: bool) -> Self {
    Node::Bool(b)
  }
}

impl From<u64> for Node {
  fn from(n: u64) -> Self {
    Node::Number(n.into())
  }
}

impl From<i64> for Node {
  fn from(n: i64) -> Self {
    Node::Number(n.into())
  }
}

impl From<&str> for Node {
  fn from(s: &str) -> Self {
    Node::String(s.to_string())
  }
}

impl From<String> for Node {
  fn from(s: String) -> Self {
    Node::String(s)
  }
}

impl From<DynamicRecord> for Node {
  fn from(record: DynamicRecord) -> Self {
    Node::Record(record)
  }
}

impl From<Vec<Node>> for Node {
  fn from(items: Vec<Node>) -> Self {
    Node::Array(items)
  }
}

impl<T: Into<Node>> From<Option<T>> for Node {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Node::Null)
  }
}

/// Attribute-addressable tree built from a JSON object.
///
/// The flattened JSON view is computed on first use and kept until the next
/// mutation.
#[derive(Clone, Default)]
pub struct DynamicRecord {
  attrs: BTreeMap<String, Node>,
  flat: OnceLock<Map<String, Value>>,
}

impl DynamicRecord {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build from an already parsed JSON object.
  pub fn from_map(map: Map<String, Value>) -> Self {
    Self {
      attrs: map
        .into_iter()
        .map(|(name, value)| (name, Node::from_value(value)))
        .collect(),
      flat: OnceLock::new(),
    }
  }

  /// Build from a JSON value.
  ///
  /// Objects are wrapped directly; a string is parsed as JSON text, which is how
  /// cached payloads come back from the store. Anything else is rejected.
  pub fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Object(map) => Ok(Self::from_map(map)),
      Value::String(text) => Self::from_json(&text),
      other => Err(Error::Argument(format!(
        "expected a JSON object, got {}",
        value_kind(&other)
      ))),
    }
  }

  /// Parse JSON text holding an object.
  pub fn from_json(text: &str) -> Result<Self> {
    let value: Value = serde_json::from_str(text)
      .map_err(|e| Error::Argument(format!("malformed JSON: {}", e)))?;
    match value {
      Value::Object(map) => Ok(Self::from_map(map)),
      other => Err(Error::Argument(format!(
        "expected a JSON object, got {}",
        value_kind(&other)
      ))),
    }
  }

  /// Attribute by name. Unknown attributes are simply absent.
  pub fn get(&self, name: &str) -> Option<&Node> {
    self.attrs.get(name)
  }

  /// Mutable access to an attribute. Drops this record's flattened view since
  /// the caller may change the child in place.
  pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
    self.flat.take();
    self.attrs.get_mut(name)
  }

  pub fn set(&mut self, name: impl Into<String>, value: impl Into<Node>) {
    self.flat.take();
    self.attrs.insert(name.into(), value.into());
  }

  pub fn remove(&mut self, name: &str) -> Option<Node> {
    self.flat.take();
    self.attrs.remove(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.attrs.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.attrs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.attrs.is_empty()
  }

  pub fn str(&self, name: &str) -> Option<&str> {
    self.get(name).and_then(Node::as_str)
  }

  pub fn u64(&self, name: &str) -> Option<u64> {
    self.get(name).and_then(Node::as_u64)
  }

  pub fn record(&self, name: &str) -> Option<&DynamicRecord> {
    self.get(name).and_then(Node::as_record)
  }

  /// Array attribute, empty when absent or not an array.
  pub fn array(&self, name: &str) -> &[Node] {
    self.get(name).and_then(Node::as_array).unwrap_or(&[])
  }

  pub fn datetime(&self, name: &str) -> Option<DateTime<FixedOffset>> {
    self.get(name).and_then(Node::as_datetime)
  }

  /// Follow a dotted path through nested records, e.g. `"status.name"`.
  pub fn lookup(&self, path: &str) -> Option<&Node> {
    let mut segments = path.split('.');
    let mut node = self.get(segments.next()?)?;
    for segment in segments {
      node = node.as_record()?.get(segment)?;
    }
    Some(node)
  }

  /// Plain JSON view of the whole tree, memoized until the next mutation.
  pub fn flatten(&self) -> &Map<String, Value> {
    self.flat.get_or_init(|| {
      self
        .attrs
        .iter()
        .map(|(name, node)| (name.clone(), node.to_value()))
        .collect()
    })
  }

  pub fn to_value(&self) -> Value {
    Value::Object(self.flatten().clone())
  }

  pub fn to_json(&self) -> String {
    self.to_value().to_string()
  }
}

impl fmt::Debug for DynamicRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map().entries(self.attrs.iter()).finish()
  }
}

impl PartialEq for DynamicRecord {
  fn eq(&self, other: &Self) -> bool {
    self.attrs == other.attrs
  }
}

impl TryFrom<Value> for DynamicRecord {
  type Error = Error;

  fn try_from(value: Value) -> Result<Self> {
    Self::from_value(value)
  }
}

impl FromStr for DynamicRecord {
  type Err = Error;

  fn from_str(text: &str) -> Result<Self> {
    Self::from_json(text)
  }
}

impl Serialize for DynamicRecord {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.flatten().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for DynamicRecord {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Self::from_value(value).map_err(serde::de::Error::custom)
  }
}

/// Parse the timestamp formats Jira emits (`2024-01-15T10:30:00.000+0000`),
/// RFC 3339, and bare dates. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  DateTime::parse_from_rfc3339(raw)
    .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
    .ok()
    .or_else(|| {
      NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
    })
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
