//! Issue tracker access.

pub mod api_types;
pub mod client;
pub mod issue;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use client::JiraClient;

/// Raw JSON access to the issue tracker.
///
/// Results are returned untyped; [`issue::issue_record`] and
/// [`DynamicRecord`](crate::record::DynamicRecord) turn them into records.
#[async_trait]
pub trait IssueTracker: Send + Sync {
  /// A single issue as `{ "key", "id", "fields" }`.
  ///
  /// Fails with [`Error::NotFound`](crate::error::Error::NotFound) when the
  /// issue does not exist.
  async fn find_issue(&self, key: &str) -> Result<Value>;

  /// Every sprint of a board (`id`, `name`, `state`, `endDate`, ...).
  async fn board_sprints(&self, board_id: u64) -> Result<Vec<Value>>;

  /// Issues matching a JQL query, in the query's order.
  async fn search_issues(&self, jql: &str) -> Result<Vec<Value>>;
}
