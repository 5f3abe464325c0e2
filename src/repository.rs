//! Cached access to issues, sprints and the hidden-issue set.

use chrono::{Local, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::cache::{bucket_key, bucket_prefix, daily_key, CacheLayer, CacheSource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::jira::api_types::{sprint_name, sprint_state};
use crate::jira::issue::issue_record;
use crate::jira::IssueTracker;
use crate::record::{DynamicRecord, Node};
use crate::vcs::VersionControl;

/// Statuses shown on the sprint board, in board order.
pub const BOARD_STATUSES: &[&str] = &["In-Progress", "Development", "Ready", "Backlog"];

const HIDDEN_KEYS: &str = "hidden_keys";
const ISSUES: &str = "issues";

/// Settings the repository needs from [`Config`].
#[derive(Debug, Clone)]
pub struct RepositorySettings {
  pub default_project: String,
  pub board_id: u64,
  pub ttl_seconds: u64,
  pub ignore_branches: Vec<String>,
}

impl From<&Config> for RepositorySettings {
  fn from(config: &Config) -> Self {
    Self {
      default_project: config.default_project.clone(),
      board_id: config.board_id,
      ttl_seconds: config.cache.ttl_seconds,
      ignore_branches: config.ignore_branches.clone(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintKind {
  /// The active sprint
  Current,
  /// The first future sprint by name
  Next,
}

impl SprintKind {
  fn cache_namespace(self) -> &'static str {
    match self {
      SprintKind::Current => "current_sprint",
      SprintKind::Next => "next_sprint",
    }
  }

  /// Pick the qualifying sprint out of a board's sprints.
  fn select(self, sprints: Vec<Value>) -> Option<Value> {
    match self {
      SprintKind::Current => sprints
        .into_iter()
        .find(|s| sprint_state(s) == Some("active")),
      SprintKind::Next => {
        let mut future: Vec<Value> = sprints
          .into_iter()
          .filter(|s| sprint_state(s) == Some("future"))
          .collect();
        future.sort_by(|a, b| sprint_name(a).cmp(sprint_name(b)));
        future.into_iter().next()
      }
    }
  }
}

/// Issues of one sprint and where they came from.
#[derive(Debug, Clone)]
pub struct Issues {
  pub records: Vec<DynamicRecord>,
  pub source: CacheSource,
}

/// Issue lookups backed by the tracker and the local cache.
///
/// Sprints and sprint issue lists are memoized for the lifetime of the value,
/// so a single command never asks the tracker twice for the same thing.
pub struct Repository<T: IssueTracker> {
  tracker: T,
  cache: CacheLayer,
  vcs: Box<dyn VersionControl>,
  settings: RepositorySettings,
  current_sprint: Option<Option<DynamicRecord>>,
  next_sprint: Option<Option<DynamicRecord>>,
  /// Keyed by sprint id
  issues: HashMap<String, Issues>,
  hidden: Option<Vec<String>>,
}

impl<T: IssueTracker> Repository<T> {
  pub fn new(
    tracker: T,
    cache: CacheLayer,
    vcs: Box<dyn VersionControl>,
    settings: RepositorySettings,
  ) -> Self {
    Self {
      tracker,
      cache,
      vcs,
      settings,
      current_sprint: None,
      next_sprint: None,
      issues: HashMap::new(),
      hidden: None,
    }
  }

  pub fn vcs(&self) -> &dyn VersionControl {
    self.vcs.as_ref()
  }

  /// Expand a short reference into a canonical issue key.
  ///
  /// `"pe-12"` becomes `"PE-12"`; `"12"` becomes `"<default project>-12"`.
  /// Blank input yields `None`.
  pub fn resolve_key(&self, short_ref: &str) -> Option<String> {
    let short_ref = short_ref.trim();
    let first = short_ref.chars().next()?;

    if first.is_ascii_alphabetic() {
      Some(short_ref.to_uppercase())
    } else {
      Some(format!("{}-{}", self.settings.default_project, short_ref).to_uppercase())
    }
  }

  /// Issue key encoded in the current branch name (`PE-42/fix-thing` gives
  /// `PE-42`), unless the branch is one of the ignored integration branches.
  pub fn current_issue_key(&self) -> Option<String> {
    let branch = self.vcs.current_branch()?;
    let segment = branch.split('/').next()?.trim();

    if segment.is_empty() || self.settings.ignore_branches.iter().any(|b| b == segment) {
      return None;
    }
    Some(segment.to_string())
  }

  /// Fetch an issue by reference, or the current branch's issue when no
  /// reference is given.
  pub async fn find_issue(&self, reference: Option<&str>) -> Result<DynamicRecord> {
    let key = reference
      .and_then(|r| self.resolve_key(r))
      .or_else(|| self.current_issue_key())
      .ok_or(Error::MissingIssueKey)?;

    let raw = self.tracker.find_issue(&key).await?;
    issue_record(raw)
  }

  pub async fn current_sprint(&mut self) -> Result<Option<DynamicRecord>> {
    self.sprint(SprintKind::Current).await
  }

  pub async fn next_sprint(&mut self) -> Result<Option<DynamicRecord>> {
    self.sprint(SprintKind::Next).await
  }

  /// Daily-cached sprint lookup. `Ok(None)` means the board has no such sprint.
  pub async fn sprint(&mut self, kind: SprintKind) -> Result<Option<DynamicRecord>> {
    let memo = match kind {
      SprintKind::Current => &self.current_sprint,
      SprintKind::Next => &self.next_sprint,
    };
    if let Some(sprint) = memo {
      return Ok(sprint.clone());
    }

    let namespace = kind.cache_namespace();
    let key = daily_key(namespace, Local::now().date_naive());
    let stale_prefix = format!("{}.", namespace);
    let tracker = &self.tracker;
    let board_id = self.settings.board_id;

    let result = self
      .cache
      .read_through(&key, &stale_prefix, false, || {
        fetch_sprint(tracker, board_id, kind)
      })
      .await?;

    let sprint = result.map(|r| r.data);
    if sprint.is_none() {
      debug!(?kind, board_id, "board has no qualifying sprint");
    }

    match kind {
      SprintKind::Current => self.current_sprint = Some(sprint.clone()),
      SprintKind::Next => self.next_sprint = Some(sprint.clone()),
    }
    Ok(sprint)
  }

  /// Board issues of a sprint, cached in TTL-sized time buckets.
  ///
  /// `refresh` skips both the in-process memo and the store.
  pub async fn issues(&mut self, refresh: bool, sprint: &DynamicRecord) -> Result<Issues> {
    let sprint_id = sprint_id(sprint)?;

    if !refresh {
      if let Some(issues) = self.issues.get(&sprint_id) {
        return Ok(issues.clone());
      }
    }

    let key = bucket_key(ISSUES, &sprint_id, self.settings.ttl_seconds, Utc::now());
    let stale_prefix = bucket_prefix(ISSUES, &sprint_id);
    let tracker = &self.tracker;

    let result = self
      .cache
      .read_through(&key, &stale_prefix, refresh, || {
        fetch_sprint_issues(tracker, &sprint_id)
      })
      .await?;

    let issues = match result {
      Some(result) => Issues {
        records: result.data,
        source: result.source,
      },
      None => Issues {
        records: Vec::new(),
        source: CacheSource::Network,
      },
    };

    match issues.source {
      CacheSource::Network => info!(sprint = %sprint_id, count = issues.records.len(), "refreshed issues"),
      CacheSource::Cache => debug!(sprint = %sprint_id, count = issues.records.len(), "using cached issues"),
    }

    self.issues.insert(sprint_id, issues.clone());
    Ok(issues)
  }

  /// Hidden issue keys, in the order they were hidden.
  pub fn hidden_keys(&mut self) -> &[String] {
    let cache = &self.cache;
    self.hidden.get_or_insert_with(|| load_hidden(cache))
  }

  pub fn is_hidden(&mut self, key: &str) -> bool {
    let key = key.trim().to_uppercase();
    self.hidden_keys().contains(&key)
  }

  /// Add a key to the hidden set. Hiding an already hidden key changes nothing.
  pub fn hide(&mut self, key: &str) -> &[String] {
    let key = key.trim().to_uppercase();
    let cache = &self.cache;
    let hidden = self.hidden.get_or_insert_with(|| load_hidden(cache));

    if !key.is_empty() && !hidden.contains(&key) {
      hidden.push(key);
    }
    cache.set_json(HIDDEN_KEYS, hidden);
    hidden
  }

  /// Remove a key from the hidden set. Showing a visible key changes nothing.
  pub fn show(&mut self, key: &str) -> &[String] {
    let key = key.trim().to_uppercase();
    let cache = &self.cache;
    let hidden = self.hidden.get_or_insert_with(|| load_hidden(cache));

    hidden.retain(|k| *k != key);
    cache.set_json(HIDDEN_KEYS, hidden);
    hidden
  }

  pub fn clear_hidden(&mut self) {
    self.cache.set(HIDDEN_KEYS, "[]");
    self.hidden = Some(Vec::new());
  }
}

async fn fetch_sprint<T: IssueTracker>(
  tracker: &T,
  board_id: u64,
  kind: SprintKind,
) -> Result<Option<DynamicRecord>> {
  let sprints = tracker.board_sprints(board_id).await?;
  kind
    .select(sprints)
    .map(DynamicRecord::from_value)
    .transpose()
}

async fn fetch_sprint_issues<T: IssueTracker>(
  tracker: &T,
  sprint_id: &str,
) -> Result<Option<Vec<DynamicRecord>>> {
  let raw = tracker.search_issues(&sprint_issues_jql(sprint_id)).await?;
  let records = raw
    .into_iter()
    .map(issue_record)
    .collect::<Result<Vec<_>>>()?;
  Ok(Some(records))
}

/// Board issues of a sprint, excluding subtasks, in rank order.
pub fn sprint_issues_jql(sprint_id: &str) -> String {
  let statuses = BOARD_STATUSES
    .iter()
    .map(|s| format!("'{}'", s))
    .collect::<Vec<_>>()
    .join(", ");

  format!(
    "sprint = {} AND status in ({}) AND issuetype not in subtaskIssueTypes() ORDER BY Rank",
    sprint_id, statuses
  )
}

fn sprint_id(sprint: &DynamicRecord) -> Result<String> {
  match sprint.get("id") {
    Some(Node::Number(n)) => Ok(n.to_string()),
    Some(Node::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
    _ => Err(Error::Argument("sprint record has no id".to_string())),
  }
}

fn load_hidden(cache: &CacheLayer) -> Vec<String> {
  let Some(raw) = cache.get(HIDDEN_KEYS) else {
    return Vec::new();
  };

  let stored: Vec<String> = match serde_json::from_str(&raw) {
    Ok(keys) => keys,
    Err(e) => {
      warn!(error = %e, "ignoring undecodable hidden key set");
      return Vec::new();
    }
  };

  let mut hidden: Vec<String> = Vec::with_capacity(stored.len());
  for key in stored {
    let key = key.trim().to_uppercase();
    if !key.is_empty() && !hidden.contains(&key) {
      hidden.push(key);
    }
  }
  hidden
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheStore, NullStore, SqliteStore};
  use crate::vcs::NullVcs;
  use async_trait::async_trait;
  use serde_json::json;
  use std::path::Path;
  use std::sync::{Arc, Mutex};

  type Calls = Arc<Mutex<Vec<String>>>;

  struct FakeTracker {
    issues: HashMap<String, Value>,
    sprints: Vec<Value>,
    search_results: Vec<Value>,
    calls: Calls,
  }

  impl FakeTracker {
    fn new(calls: &Calls) -> Self {
      Self {
        issues: HashMap::new(),
        sprints: vec![
          json!({ "id": 6, "name": "Sprint 6", "state": "closed" }),
          json!({ "id": 7, "name": "Sprint 7", "state": "active", "endDate": "2024-03-15T17:00:00.000Z" }),
          json!({ "id": 9, "name": "Sprint 9", "state": "future" }),
          json!({ "id": 8, "name": "Sprint 8", "state": "future" }),
        ],
        search_results: vec![raw_issue("PE-1", "10001"), raw_issue("PE-2", "10002")],
        calls: Arc::clone(calls),
      }
    }

    fn with_issue(mut self, key: &str, id: &str) -> Self {
      self.issues.insert(key.to_string(), raw_issue(key, id));
      self
    }

    fn record(&self, call: String) {
      self.calls.lock().unwrap().push(call);
    }
  }

  #[async_trait]
  impl IssueTracker for FakeTracker {
    async fn find_issue(&self, key: &str) -> Result<Value> {
      self.record(format!("issue:{}", key));
      self.issues.get(key).cloned().ok_or_else(|| Error::NotFound {
        key: key.to_string(),
      })
    }

    async fn board_sprints(&self, board_id: u64) -> Result<Vec<Value>> {
      self.record(format!("sprints:{}", board_id));
      Ok(self.sprints.clone())
    }

    async fn search_issues(&self, jql: &str) -> Result<Vec<Value>> {
      self.record(format!("search:{}", jql));
      Ok(self.search_results.clone())
    }
  }

  struct FixedBranch(Option<&'static str>);

  impl VersionControl for FixedBranch {
    fn current_branch(&self) -> Option<String> {
      self.0.map(String::from)
    }

    fn is_clean(&self) -> bool {
      true
    }
  }

  fn raw_issue(key: &str, id: &str) -> Value {
    json!({
      "key": key,
      "id": id,
      "fields": {
        "summary": format!("Summary of {}", key),
        "status": { "name": "Ready" },
        "created": "2024-01-15T10:30:00.000+0000"
      }
    })
  }

  fn settings() -> RepositorySettings {
    RepositorySettings {
      default_project: "PE".to_string(),
      board_id: 42,
      ttl_seconds: 14_400,
      ignore_branches: vec!["master".to_string(), "develop".to_string()],
    }
  }

  fn repo(
    store: Box<dyn CacheStore>,
    tracker: FakeTracker,
    branch: Option<&'static str>,
  ) -> Repository<FakeTracker> {
    Repository::new(
      tracker,
      CacheLayer::new(store, "jt"),
      Box::new(FixedBranch(branch)),
      settings(),
    )
  }

  fn disk_store(path: &Path) -> Box<dyn CacheStore> {
    Box::new(SqliteStore::open(path).unwrap())
  }

  fn calls_matching(calls: &Calls, prefix: &str) -> usize {
    calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.starts_with(prefix))
      .count()
  }

  #[test]
  fn test_resolve_key() {
    let calls = Calls::default();
    let repo = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), None);

    assert_eq!(repo.resolve_key("1234").as_deref(), Some("PE-1234"));
    assert_eq!(repo.resolve_key("pe-1234").as_deref(), Some("PE-1234"));
    assert_eq!(repo.resolve_key(" ops-7 ").as_deref(), Some("OPS-7"));
    assert_eq!(repo.resolve_key(""), None);
    assert_eq!(repo.resolve_key("   "), None);
  }

  #[test]
  fn test_current_issue_key_from_branch() {
    let calls = Calls::default();
    let feature = repo(
      Box::new(NullStore::new()),
      FakeTracker::new(&calls),
      Some("PE-42/fix-thing"),
    );
    assert_eq!(feature.current_issue_key().as_deref(), Some("PE-42"));

    let bare = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), Some("PE-7"));
    assert_eq!(bare.current_issue_key().as_deref(), Some("PE-7"));

    let develop = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), Some("develop"));
    assert_eq!(develop.current_issue_key(), None);

    let detached = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), None);
    assert_eq!(detached.current_issue_key(), None);

    let outside = Repository::new(
      FakeTracker::new(&calls),
      CacheLayer::new(Box::new(NullStore::new()), "jt"),
      Box::new(NullVcs),
      settings(),
    );
    assert_eq!(outside.current_issue_key(), None);
  }

  #[tokio::test]
  async fn test_find_issue_by_reference_and_branch() {
    let calls = Calls::default();
    let tracker = FakeTracker::new(&calls)
      .with_issue("PE-12", "10012")
      .with_issue("PE-42", "10042");
    let repo = repo(Box::new(NullStore::new()), tracker, Some("PE-42/fix-thing"));

    let issue = repo.find_issue(Some("12")).await.unwrap();
    assert_eq!(issue.str("key"), Some("PE-12"));
    assert_eq!(issue.u64("id"), Some(10012));
    assert_eq!(issue.str("created"), Some("2024-01-15T10:30:00+00:00"));

    let current = repo.find_issue(None).await.unwrap();
    assert_eq!(current.str("key"), Some("PE-42"));

    let blank = repo.find_issue(Some("  ")).await.unwrap();
    assert_eq!(blank.str("key"), Some("PE-42"));
  }

  #[tokio::test]
  async fn test_find_issue_failures() {
    let calls = Calls::default();
    let on_develop = repo(
      Box::new(NullStore::new()),
      FakeTracker::new(&calls),
      Some("develop"),
    );

    assert!(matches!(
      on_develop.find_issue(None).await,
      Err(Error::MissingIssueKey)
    ));
    assert!(matches!(
      on_develop.find_issue(Some("999")).await,
      Err(Error::NotFound { key }) if key == "PE-999"
    ));
    assert_eq!(calls_matching(&calls, "issue:"), 1);
  }

  #[tokio::test]
  async fn test_current_sprint_is_cached_for_the_day() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let calls = Calls::default();

    let mut first = repo(disk_store(&path), FakeTracker::new(&calls), None);
    let sprint = first.current_sprint().await.unwrap().unwrap();
    assert_eq!(sprint.str("name"), Some("Sprint 7"));
    assert_eq!(sprint.u64("id"), Some(7));

    // Memoized within the process
    first.current_sprint().await.unwrap();
    assert_eq!(calls_matching(&calls, "sprints:"), 1);

    // Read back from the store by the next invocation
    let mut second = repo(disk_store(&path), FakeTracker::new(&calls), None);
    let cached = second.current_sprint().await.unwrap().unwrap();
    assert_eq!(cached, sprint);
    assert_eq!(calls_matching(&calls, "sprints:"), 1);
  }

  #[tokio::test]
  async fn test_next_sprint_is_first_future_by_name() {
    let calls = Calls::default();
    let mut repo = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), None);
    let sprint = repo.next_sprint().await.unwrap().unwrap();
    assert_eq!(sprint.str("name"), Some("Sprint 8"));
  }

  #[tokio::test]
  async fn test_missing_sprint_keeps_previous_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let stale = "jt.current_sprint.2000-01-01";
    disk_store(&path).set(stale, r#"{"id": 1}"#).unwrap();

    let calls = Calls::default();
    let mut tracker = FakeTracker::new(&calls);
    tracker.sprints.retain(|s| sprint_state(s) != Some("active"));

    let mut repo = repo(disk_store(&path), tracker, None);
    assert!(repo.current_sprint().await.unwrap().is_none());
    assert!(repo.current_sprint().await.unwrap().is_none());
    assert_eq!(calls_matching(&calls, "sprints:"), 1);

    let store = disk_store(&path);
    assert!(store.get(stale).unwrap().is_some());
  }

  #[tokio::test]
  async fn test_fresh_sprint_evicts_older_days() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    disk_store(&path)
      .set("jt.current_sprint.2000-01-01", r#"{"id": 1}"#)
      .unwrap();

    let calls = Calls::default();
    let mut repo = repo(disk_store(&path), FakeTracker::new(&calls), None);
    repo.current_sprint().await.unwrap().unwrap();

    let keys = disk_store(&path)
      .keys_with_prefix("jt.current_sprint.")
      .unwrap();
    assert_eq!(keys.len(), 1);
    assert_ne!(keys[0], "jt.current_sprint.2000-01-01");
  }

  #[tokio::test]
  async fn test_issues_query_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let calls = Calls::default();
    let sprint = DynamicRecord::from_value(json!({ "id": 7, "name": "Sprint 7" })).unwrap();

    let mut first = repo(disk_store(&path), FakeTracker::new(&calls), None);
    let issues = first.issues(false, &sprint).await.unwrap();
    assert_eq!(issues.source, CacheSource::Network);
    assert_eq!(issues.records.len(), 2);
    assert_eq!(issues.records[0].str("key"), Some("PE-1"));

    let searches: Vec<String> = calls.lock().unwrap().clone();
    assert_eq!(
      searches,
      vec![format!("search:{}", sprint_issues_jql("7"))]
    );
    assert!(searches[0].contains("status in ('In-Progress', 'Development', 'Ready', 'Backlog')"));
    assert!(searches[0].ends_with("ORDER BY Rank"));

    // Memoized: no second query
    let again = first.issues(false, &sprint).await.unwrap();
    assert_eq!(again.records, issues.records);
    assert_eq!(calls_matching(&calls, "search:"), 1);

    // Next invocation reads the bucket back
    let mut second = repo(disk_store(&path), FakeTracker::new(&calls), None);
    let cached = second.issues(false, &sprint).await.unwrap();
    assert_eq!(cached.source, CacheSource::Cache);
    assert_eq!(cached.records, issues.records);
    assert_eq!(calls_matching(&calls, "search:"), 1);
  }

  #[tokio::test]
  async fn test_refresh_requeries_and_drops_old_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    disk_store(&path).set("jt.issues.7.1", "[]").unwrap();
    disk_store(&path).set("jt.issues.70.1", "[]").unwrap();

    let calls = Calls::default();
    let sprint = DynamicRecord::from_value(json!({ "id": "7" })).unwrap();
    let mut repo = repo(disk_store(&path), FakeTracker::new(&calls), None);

    repo.issues(false, &sprint).await.unwrap();
    let refreshed = repo.issues(true, &sprint).await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(calls_matching(&calls, "search:"), 2);

    let store = disk_store(&path);
    let keys = store.keys_with_prefix("jt.issues.7.").unwrap();
    assert_eq!(keys.len(), 1);
    assert_ne!(keys[0], "jt.issues.7.1");
    assert!(store.get("jt.issues.70.1").unwrap().is_some());
  }

  #[tokio::test]
  async fn test_issues_require_sprint_id() {
    let calls = Calls::default();
    let mut repo = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), None);
    let sprint = DynamicRecord::from_value(json!({ "name": "No id" })).unwrap();
    assert!(matches!(
      repo.issues(false, &sprint).await,
      Err(Error::Argument(_))
    ));
  }

  #[tokio::test]
  async fn test_null_store_degrades_to_memory() {
    let calls = Calls::default();
    let sprint = DynamicRecord::from_value(json!({ "id": 7 })).unwrap();

    for _ in 0..2 {
      let mut repo = repo(Box::new(NullStore::new()), FakeTracker::new(&calls), None);
      let issues = repo.issues(false, &sprint).await.unwrap();
      assert_eq!(issues.source, CacheSource::Network);
      repo.issues(false, &sprint).await.unwrap();

      repo.hide("pe-1");
      assert_eq!(repo.hidden_keys(), ["PE-1"]);
    }
    assert_eq!(calls_matching(&calls, "search:"), 2);
  }

  #[test]
  fn test_hidden_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let calls = Calls::default();

    let mut repo1 = repo(disk_store(&path), FakeTracker::new(&calls), None);
    assert!(repo1.hidden_keys().is_empty());

    assert_eq!(repo1.hide("pe-1"), ["PE-1"]);
    assert_eq!(repo1.hide("PE-1"), ["PE-1"]);
    assert_eq!(repo1.hide("pe-2"), ["PE-1", "PE-2"]);
    assert!(repo1.is_hidden("pe-2"));

    // Persisted for the next invocation
    let mut repo2 = repo(disk_store(&path), FakeTracker::new(&calls), None);
    assert_eq!(repo2.hidden_keys(), ["PE-1", "PE-2"]);

    assert_eq!(repo2.show("PE-1"), ["PE-2"]);
    assert_eq!(repo2.show("PE-1"), ["PE-2"]);

    repo2.clear_hidden();
    assert!(repo2.hidden_keys().is_empty());

    let mut repo3 = repo(disk_store(&path), FakeTracker::new(&calls), None);
    assert!(repo3.hidden_keys().is_empty());
  }

  #[test]
  fn test_hidden_keys_normalized_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    disk_store(&path)
      .set("jt.hidden_keys", r#"["pe-1", "PE-1", "pe-3"]"#)
      .unwrap();

    let calls = Calls::default();
    let mut normalized = repo(disk_store(&path), FakeTracker::new(&calls), None);
    assert_eq!(normalized.hidden_keys(), ["PE-1", "PE-3"]);

    disk_store(&path).set("jt.hidden_keys", "garbage").unwrap();
    let mut garbage = repo(disk_store(&path), FakeTracker::new(&calls), None);
    assert!(garbage.hidden_keys().is_empty());
  }
}
