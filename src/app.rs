use chrono::Local;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::cache::{CacheLayer, CacheStore, NullStore, SqliteStore};
use crate::cli::{Args, Command};
use crate::config::{CacheConfig, Config};
use crate::dates::weekdays_until;
use crate::error::Result;
use crate::jira::JiraClient;
use crate::record::{DynamicRecord, Node};
use crate::repository::{Repository, RepositorySettings, SprintKind};
use crate::vcs::{GitContext, NullVcs, VersionControl};

/// Words of description shown per issue in board listings.
const LISTING_WORDS: usize = 25;
const SEPARATOR_WIDTH: usize = 72;
/// Characters of subtask summary shown in the subtask table.
const SUBTASK_SUMMARY_CHARS: usize = 40;

/// Which issues of a sprint a board listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardFilter {
  Mine,
  Unassigned,
  All,
}

impl BoardFilter {
  /// Whether `issue` belongs in the listing for user `me`.
  pub fn matches(self, issue: &DynamicRecord, me: &str) -> bool {
    let assignee = issue.record("assignee");
    match self {
      BoardFilter::All => true,
      BoardFilter::Unassigned => assignee.map_or(true, DynamicRecord::is_empty),
      BoardFilter::Mine => assignee.is_some_and(|a| {
        a.str("name") == Some(me) || a.str("emailAddress") == Some(me)
      }),
    }
  }

  fn heading(self) -> Option<&'static str> {
    match self {
      BoardFilter::Mine => None,
      BoardFilter::Unassigned => Some("UNASSIGNED BOARD ISSUES"),
      BoardFilter::All => Some("ALL BOARD ISSUES"),
    }
  }

  fn empty_message(self) -> &'static str {
    match self {
      BoardFilter::Mine => "No issues currently assigned to you.",
      BoardFilter::Unassigned => "No unassigned issues currently on board.",
      BoardFilter::All => "No issues currently on board.",
    }
  }
}

/// One board listing: which sprint, which issues, and how many of them.
#[derive(Debug, Clone, Copy)]
struct BoardView {
  filter: BoardFilter,
  sprint: SprintKind,
  refresh: bool,
  /// Show only the first visible issue, untruncated
  first_only: bool,
}

impl BoardView {
  fn new(filter: BoardFilter, sprint: SprintKind) -> Self {
    Self {
      filter,
      sprint,
      refresh: false,
      first_only: false,
    }
  }

  fn heading(&self, filter: BoardFilter) -> Option<&'static str> {
    if self.first_only && filter == BoardFilter::Unassigned {
      return Some("NEXT UNASSIGNED BOARD ISSUE");
    }
    filter.heading()
  }
}

/// Main application state
pub struct App {
  config: Config,
  repository: Repository<JiraClient>,
}

impl App {
  /// Wire up the tracker, the cache store and the git context.
  ///
  /// A store or repository that cannot be opened is replaced by its null
  /// variant; only the tracker client is required.
  pub fn new(config: Config) -> Result<Self> {
    let tracker = JiraClient::new(&config)?;
    let cache = CacheLayer::new(open_store(&config.cache), config.cache.namespace.clone());
    let vcs = match std::env::current_dir() {
      Ok(dir) => open_vcs(&dir),
      Err(e) => {
        debug!(error = %e, "no working directory, no git context");
        Box::new(NullVcs)
      }
    };
    let repository = Repository::new(tracker, cache, vcs, RepositorySettings::from(&config));

    Ok(Self { config, repository })
  }

  pub async fn run(&mut self, args: &Args) -> Result<()> {
    let Some(command) = &args.command else {
      return match &args.issue {
        Some(issue) => self.print_found_issue(issue).await,
        None => self.print_board(BoardView::new(BoardFilter::Mine, SprintKind::Current)).await,
      };
    };

    match command {
      Command::List => self.print_board(BoardView::new(BoardFilter::Mine, SprintKind::Current)).await,
      Command::All => self.print_board(BoardView::new(BoardFilter::All, SprintKind::Current)).await,
      Command::Todo => {
        self.print_board(BoardView::new(BoardFilter::Unassigned, SprintKind::Current)).await
      }
      Command::Backlog => {
        self.print_board(BoardView::new(BoardFilter::Unassigned, SprintKind::Next)).await
      }
      Command::Pluck => {
        self
          .print_board(BoardView {
            first_only: true,
            ..BoardView::new(BoardFilter::Unassigned, SprintKind::Current)
          })
          .await
      }
      Command::Refresh => {
        self
          .print_board(BoardView {
            refresh: true,
            ..BoardView::new(BoardFilter::Mine, SprintKind::Current)
          })
          .await
      }
      Command::Current => self.print_current_issue().await,
      Command::Subtasks { issue } => self.print_subtasks(issue.as_deref()).await,
      Command::Sprint => self.print_sprints().await,
      Command::Hide { issue } => {
        self.hide_issue(issue);
        Ok(())
      }
      Command::Show { issue } => {
        self.show_issue(issue);
        Ok(())
      }
      Command::Url { issue, board } => self.print_url(issue.as_deref(), *board).await,
      Command::Keys { issues } => self.print_keys(issues).await,
    }
  }

  async fn print_found_issue(&self, reference: &str) -> Result<()> {
    let issue = self.repository.find_issue(Some(reference)).await?;
    println!("{}", self.render_issue(&issue, None, true));
    Ok(())
  }

  async fn print_current_issue(&self) -> Result<()> {
    let issue = self.repository.find_issue(None).await?;
    println!("{}", self.render_issue(&issue, None, false));

    if !self.repository.vcs().is_clean() {
      println!("\n(working tree has uncommitted changes)");
    }
    Ok(())
  }

  async fn print_subtasks(&self, reference: Option<&str>) -> Result<()> {
    let reference = reference.filter(|r| !r.trim().is_empty());
    let issue = self.repository.find_issue(reference).await?;
    println!("{}", self.render_issue(&issue, Some(LISTING_WORDS), false));

    match render_subtask_table(&issue) {
      Some(table) => println!("\n{}", table),
      None => println!("\nNo subtasks."),
    }
    Ok(())
  }

  async fn print_sprints(&mut self) -> Result<()> {
    let today = Local::now().date_naive();
    for (label, kind) in [("Current", SprintKind::Current), ("Next", SprintKind::Next)] {
      match self.repository.sprint(kind).await? {
        Some(sprint) => println!("{}: {}", label, sprint_summary(&sprint, today)),
        None => println!("{}: none", label),
      }
    }
    Ok(())
  }

  async fn print_board(&mut self, view: BoardView) -> Result<()> {
    let Some(sprint) = self.repository.sprint(view.sprint).await? else {
      println!("No {} sprint on board {}.", sprint_label(view.sprint), self.config.board_id);
      return Ok(());
    };
    println!("{}", sprint_summary(&sprint, Local::now().date_naive()));

    let issues = self.repository.issues(view.refresh, &sprint).await?;
    debug!(source = ?issues.source, count = issues.records.len(), "board issues");

    // An empty board falls back to the full listing
    let filter = if issues.records.is_empty() { BoardFilter::All } else { view.filter };
    let me = self.config.jira.user.as_str();
    let hidden = self.repository.hidden_keys().to_vec();

    let shown: Vec<&DynamicRecord> = issues
      .records
      .iter()
      .filter(|issue| filter.matches(issue, me))
      .collect();

    if let Some(heading) = view.heading(filter) {
      println!("{}", heading);
    }
    if shown.is_empty() {
      println!("{}", filter.empty_message());
    }

    let with_assignee = filter != BoardFilter::Mine;
    let words = if view.first_only { None } else { Some(LISTING_WORDS) };
    for issue in shown {
      if issue.str("key").is_some_and(|key| hidden.iter().any(|h| h == key)) {
        continue;
      }
      println!("{}", self.render_issue(issue, words, with_assignee));
      if view.first_only {
        break;
      }
      println!("{}", "-".repeat(SEPARATOR_WIDTH));
    }

    if !hidden.is_empty() {
      println!(
        "HIDDEN: {} (use `jt show ISSUE | ALL` to unhide)",
        hidden.join(", ")
      );
    }
    Ok(())
  }

  fn hide_issue(&mut self, reference: &str) {
    let Some(key) = self.repository.resolve_key(reference) else {
      println!("Please provide an issue to hide.");
      return;
    };
    if self.repository.is_hidden(&key) {
      println!("Already hidden.");
      return;
    }

    let hidden = self.repository.hide(&key);
    println!("{} added to hidden issues. Now hiding: {}", key, hidden.join(", "));
  }

  fn show_issue(&mut self, reference: &str) {
    if reference.trim().eq_ignore_ascii_case("all") {
      self.repository.clear_hidden();
      println!("Cleared all hidden issues.");
      return;
    }

    let Some(key) = self.repository.resolve_key(reference) else {
      println!("Please provide an issue to show, or ALL.");
      return;
    };
    if !self.repository.is_hidden(&key) {
      println!("Not hidden.");
      return;
    }

    let hidden = self.repository.show(&key);
    println!("{} removed from hidden issues. Now hiding: {}", key, hidden.join(", "));
  }

  async fn print_url(&self, reference: Option<&str>, board: bool) -> Result<()> {
    if board {
      println!("{}", self.config.board_url()?);
      return Ok(());
    }

    let key = match reference.filter(|r| !r.trim().is_empty()) {
      // Fetch so that moved issues print their new key
      Some(reference) => self
        .repository
        .find_issue(Some(reference))
        .await?
        .str("key")
        .map(String::from),
      None => self.repository.current_issue_key(),
    };

    match key {
      Some(key) => println!("{}", self.config.issue_url(&key)?),
      None => println!("No issue from current branch."),
    }
    Ok(())
  }

  async fn print_keys(&self, references: &[String]) -> Result<()> {
    for reference in references {
      let issue = self.repository.find_issue(Some(reference)).await?;
      let requested = self.repository.resolve_key(reference).unwrap_or_default();
      println!("{}", key_line(&requested, &issue));
    }
    Ok(())
  }

  fn render_issue(&self, issue: &DynamicRecord, words: Option<usize>, with_assignee: bool) -> String {
    let current = self.repository.current_issue_key();
    let is_current = current.is_some() && issue.str("key") == current.as_deref();
    render_issue(issue, words, with_assignee, is_current)
  }
}

fn open_store(cache: &CacheConfig) -> Box<dyn CacheStore> {
  let opened = match &cache.path {
    Some(path) => SqliteStore::open(path),
    None => SqliteStore::open_default(),
  };

  match opened {
    Ok(store) => Box::new(store),
    Err(e) => {
      debug!(error = %e, "falling back to the null cache store");
      Box::new(NullStore::new())
    }
  }
}

fn open_vcs(workdir: &Path) -> Box<dyn VersionControl> {
  match GitContext::open(workdir) {
    Ok(git) => Box::new(git),
    Err(e) => {
      debug!(error = %e, "no git context");
      Box::new(NullVcs)
    }
  }
}

fn sprint_label(kind: SprintKind) -> &'static str {
  match kind {
    SprintKind::Current => "active",
    SprintKind::Next => "future",
  }
}

/// `Sprint 7 (ends 3 weekdays from now on 2024-03-15)`
pub fn sprint_summary(sprint: &DynamicRecord, today: chrono::NaiveDate) -> String {
  let name = sprint.str("name").unwrap_or("Unnamed sprint");
  let end = sprint.datetime("endDate").map(|dt| dt.date_naive());

  match (weekdays_until(end, today), end) {
    (Some(weekdays), Some(end)) => {
      format!("{} (ends {} weekdays from now on {})", name, weekdays, end)
    }
    _ => format!("{} (end date unknown)", name),
  }
}

fn key_line(requested: &str, issue: &DynamicRecord) -> String {
  let key = issue.str("key").unwrap_or(requested);
  let summary = issue.str("summary").unwrap_or("");
  if key == requested {
    format!("{} - {}", key, summary)
  } else {
    format!("{} -> {} - {}", requested, key, summary)
  }
}

/// Plain-text view of an issue.
///
/// `words` truncates the description; the current branch's issue is marked
/// with a leading `*`.
pub fn render_issue(
  issue: &DynamicRecord,
  words: Option<usize>,
  with_assignee: bool,
  is_current: bool,
) -> String {
  let mut lines = Vec::new();

  let key = issue.str("key").unwrap_or("?");
  let status = issue
    .lookup("status.name")
    .and_then(Node::as_str)
    .unwrap_or("No status");
  let mut title = format!("{}  [{}]  {}", key, status, issue.str("summary").unwrap_or(""));
  if with_assignee {
    let assignee = issue
      .lookup("assignee.displayName")
      .and_then(Node::as_str)
      .unwrap_or("Unassigned");
    title = format!("{}  <-  {}", assignee, title);
  }
  if is_current {
    title = format!("* {}", title);
  }
  lines.push(title);

  if let Some(parent) = issue.record("parent") {
    lines.push(format!(
      "---> SUBTASK of {}: {}",
      parent.str("key").unwrap_or("?"),
      parent.lookup("fields.summary").and_then(Node::as_str).unwrap_or("")
    ));
  }

  let stamp = |field: &str| {
    issue
      .datetime(field)
      .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
      .unwrap_or_else(|| "unknown".to_string())
  };
  lines.push(format!("Created {}, Updated {}", stamp("created"), stamp("updated")));

  if let Some(description) = issue.str("description").filter(|d| !d.trim().is_empty()) {
    lines.push(String::new());
    lines.push(match words {
      Some(words) => truncate_words(description, words),
      None => description.to_string(),
    });
  }

  if let Some(comments) = render_comments(issue) {
    lines.push(comments);
  }

  let subtasks = issue.array("subtasks");
  if !subtasks.is_empty() {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for subtask in subtasks.iter().filter_map(Node::as_record) {
      let status = subtask
        .lookup("fields.status.name")
        .and_then(Node::as_str)
        .unwrap_or("No status");
      *counts.entry(status).or_default() += 1;
    }
    let counts: Vec<String> = counts
      .iter()
      .map(|(status, count)| format!("{} {}", count, status))
      .collect();
    lines.push(format!(
      "\n------- {} Subtasks:  {}",
      subtasks.len(),
      counts.join("  ")
    ));
  }

  lines.join("\n")
}

/// Comment count followed by a created / author / body table.
fn render_comments(issue: &DynamicRecord) -> Option<String> {
  let comments = issue.record("comment")?.array("comments");
  if comments.is_empty() {
    return None;
  }

  let mut lines = vec![
    format!("\n------- {} Comments\n", comments.len()),
    format!("{:<14}{:<15}Comment", "Created", "Author"),
  ];
  for comment in comments.iter().filter_map(Node::as_record) {
    let created = comment
      .datetime("created")
      .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
      .unwrap_or_default();
    let author = comment
      .lookup("author.displayName")
      .and_then(Node::as_str)
      .unwrap_or("Unknown");
    let body = comment.str("body").unwrap_or("").trim();
    lines.push(format!("{:<14}{:<15}{}", created, author, body));
  }
  Some(lines.join("\n"))
}

/// Key, status, priority and summary of every subtask; `None` without any.
pub fn render_subtask_table(issue: &DynamicRecord) -> Option<String> {
  let subtasks = issue.array("subtasks");
  if subtasks.is_empty() {
    return None;
  }

  let mut lines = vec![format!(
    "{:<10}{:<13}{:<10}Summary",
    "Subtask", "Status", "Priority"
  )];
  for subtask in subtasks.iter().filter_map(Node::as_record) {
    let field = |path: &str| subtask.lookup(path).and_then(Node::as_str);
    lines.push(format!(
      "{:<10}{:<13}{:<10}{}",
      subtask.str("key").unwrap_or("?"),
      field("fields.status.name").unwrap_or("No status"),
      field("fields.priority.name").unwrap_or("Unset"),
      truncate_chars(field("fields.summary").unwrap_or(""), SUBTASK_SUMMARY_CHARS)
    ));
  }
  Some(lines.join("\n"))
}

fn truncate_chars(text: &str, max: usize) -> String {
  if text.chars().count() <= max {
    return text.to_string();
  }
  let kept: String = text.chars().take(max.saturating_sub(3)).collect();
  format!("{}...", kept)
}

fn truncate_words(text: &str, words: usize) -> String {
  let mut iter = text.split_whitespace();
  let kept: Vec<&str> = iter.by_ref().take(words).collect();
  if iter.next().is_some() {
    format!("{}...", kept.join(" "))
  } else {
    text.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use serde_json::json;

  fn issue(value: serde_json::Value) -> DynamicRecord {
    DynamicRecord::from_value(value).unwrap()
  }

  #[test]
  fn test_board_filters() {
    let mine = issue(json!({ "key": "PE-1", "assignee": { "name": "dana", "emailAddress": "dana@example.com" } }));
    let by_email = issue(json!({ "key": "PE-2", "assignee": { "emailAddress": "dana@example.com" } }));
    let theirs = issue(json!({ "key": "PE-3", "assignee": { "name": "sam" } }));
    let nobody = issue(json!({ "key": "PE-4", "assignee": null }));
    let missing = issue(json!({ "key": "PE-5" }));

    assert!(BoardFilter::Mine.matches(&mine, "dana"));
    assert!(BoardFilter::Mine.matches(&by_email, "dana@example.com"));
    assert!(!BoardFilter::Mine.matches(&theirs, "dana"));
    assert!(!BoardFilter::Mine.matches(&nobody, "dana"));

    assert!(BoardFilter::Unassigned.matches(&nobody, "dana"));
    assert!(BoardFilter::Unassigned.matches(&missing, "dana"));
    assert!(!BoardFilter::Unassigned.matches(&theirs, "dana"));

    assert!(BoardFilter::All.matches(&theirs, "dana"));
  }

  #[test]
  fn test_sprint_summary() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
    let sprint = issue(json!({ "name": "Sprint 7", "endDate": "2024-03-15T12:00:00.000Z" }));
    assert_eq!(
      sprint_summary(&sprint, today),
      "Sprint 7 (ends 3 weekdays from now on 2024-03-15)"
    );

    let open_ended = issue(json!({ "name": "Sprint 8" }));
    assert_eq!(sprint_summary(&open_ended, today), "Sprint 8 (end date unknown)");
  }

  #[test]
  fn test_render_issue() {
    let record = issue(json!({
      "key": "PE-42",
      "summary": "Fix the thing",
      "status": { "name": "Ready" },
      "assignee": { "displayName": "Dana" },
      "description": "one two three four five",
      "subtasks": [
        { "key": "PE-43", "fields": { "status": { "name": "Done" } } },
        { "key": "PE-44", "fields": { "status": { "name": "Done" } } },
        { "key": "PE-45", "fields": { "status": { "name": "Ready" } } }
      ]
    }));

    let text = render_issue(&record, Some(3), true, true);
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("* Dana  <-  PE-42  [Ready]  Fix the thing"));
    assert_eq!(lines.next(), Some("Created unknown, Updated unknown"));
    assert!(text.contains("one two three..."));
    assert!(text.contains("3 Subtasks:  2 Done  1 Ready"));

    let plain = render_issue(&record, None, false, false);
    assert!(plain.starts_with("PE-42  [Ready]  Fix the thing"));
    assert!(plain.contains("one two three four five"));
  }

  #[test]
  fn test_truncate_words() {
    assert_eq!(truncate_words("a b c", 5), "a b c");
    assert_eq!(truncate_words("a  b c d", 2), "a b...");
  }

  #[test]
  fn test_key_line() {
    let moved = issue(json!({ "key": "OPS-9", "summary": "Moved" }));
    assert_eq!(key_line("PE-9", &moved), "PE-9 -> OPS-9 - Moved");

    let same = issue(json!({ "key": "PE-9", "summary": "Stayed" }));
    assert_eq!(key_line("PE-9", &same), "PE-9 - Stayed");
  }

  #[test]
  fn test_subtask_table() {
    let record = issue(json!({
      "key": "PE-42",
      "subtasks": [
        {
          "key": "PE-43",
          "fields": {
            "summary": "A subtask summary that goes on for quite a bit longer than forty characters",
            "status": { "name": "Done" },
            "priority": { "name": "Highest" }
          }
        },
        { "key": "PE-44", "fields": { "summary": "Short", "status": { "name": "Ready" } } }
      ]
    }));

    let table = render_subtask_table(&record).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Subtask   Status       Priority  Summary");
    assert_eq!(
      lines[1],
      "PE-43     Done         Highest   A subtask summary that goes on for qu..."
    );
    assert_eq!(lines[2], "PE-44     Ready        Unset     Short");

    assert!(render_subtask_table(&issue(json!({ "key": "PE-1" }))).is_none());
  }

  #[test]
  fn test_comment_table() {
    let record = issue(json!({
      "key": "PE-42",
      "comment": {
        "comments": [
          { "author": { "displayName": "Dana" }, "body": "Looks good", "created": "2024-01-15T12:00:00.000+0000" },
          { "body": "Anonymous note" }
        ]
      }
    }));

    let text = render_issue(&record, None, false, false);
    assert!(text.contains("------- 2 Comments"));
    assert!(text.contains("Created       Author         Comment"));
    assert!(text.contains("Dana           Looks good"));
    assert!(text.contains("Unknown        Anonymous note"));

    let silent = render_issue(&issue(json!({ "key": "PE-1", "comment": { "comments": [] } })), None, false, false);
    assert!(!silent.contains("Comments"));
  }

  #[test]
  fn test_first_only_heading() {
    let pluck = BoardView {
      first_only: true,
      ..BoardView::new(BoardFilter::Unassigned, SprintKind::Current)
    };
    assert_eq!(pluck.heading(BoardFilter::Unassigned), Some("NEXT UNASSIGNED BOARD ISSUE"));
    // An empty board falls back to the full listing heading
    assert_eq!(pluck.heading(BoardFilter::All), Some("ALL BOARD ISSUES"));

    let todo = BoardView::new(BoardFilter::Unassigned, SprintKind::Current);
    assert_eq!(todo.heading(BoardFilter::Unassigned), Some("UNASSIGNED BOARD ISSUES"));
  }

  #[test]
  fn test_unopenable_store_falls_back_to_null() {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig {
      ttl_seconds: 60,
      namespace: "jt".to_string(),
      path: Some(dir.path().to_path_buf()),
    };

    let store = open_store(&config);
    assert_eq!(store.get("jt.hidden_keys").unwrap(), None);
    store.set("jt.hidden_keys", "[]").unwrap();
    assert_eq!(store.get("jt.hidden_keys").unwrap(), None);
    assert!(store.keys_with_prefix("jt.").unwrap().is_empty());
    store.delete("jt.hidden_keys").unwrap();
  }

  #[test]
  fn test_openable_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig {
      ttl_seconds: 60,
      namespace: "jt".to_string(),
      path: Some(dir.path().join("cache.db")),
    };

    let store = open_store(&config);
    store.set("jt.hidden_keys", "[]").unwrap();
    assert_eq!(store.get("jt.hidden_keys").unwrap().as_deref(), Some("[]"));
  }

  #[test]
  fn test_vcs_outside_repository_falls_back_to_null() {
    let dir = tempfile::tempdir().unwrap();
    let vcs = open_vcs(dir.path());
    assert_eq!(vcs.current_branch(), None);
    assert!(!vcs.is_clean());
  }
}
