use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::config::{AuthType, Config, Credential};
use crate::error::{Error, Result};
use crate::jira::api_types::{issue_payload, ApiSprintPage};
use crate::jira::IssueTracker;

/// Page size for agile endpoints.
const MAX_RESULTS: u64 = 50;

/// Jira API client wrapper
#[derive(Clone)]
pub struct JiraClient {
  client: gouqi::r#async::Jira,
}

impl JiraClient {
  pub fn new(config: &Config) -> Result<Self> {
    let credentials = match &config.jira.credential {
      Credential::Password(password) => {
        gouqi::Credentials::Basic(config.jira.user.clone(), password.expose().to_string())
      }
      Credential::Token(token) => match config.jira.auth_type.resolve(&config.jira.url) {
        AuthType::Onpremise => gouqi::Credentials::Bearer(token.expose().to_string()),
        _ => gouqi::Credentials::Basic(config.jira.user.clone(), token.expose().to_string()),
      },
    };

    let host = config.jira.url.as_str().trim_end_matches('/');
    let client = gouqi::r#async::Jira::new(host, credentials)
      .map_err(|e| Error::Tracker(format!("failed to create Jira client: {}", e)))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl IssueTracker for JiraClient {
  /// Get a single issue by key
  async fn find_issue(&self, key: &str) -> Result<Value> {
    debug!(key, "fetching issue");
    let issue = self.client.issues().get(key).await.map_err(|e| {
      if is_not_found(&e) {
        Error::NotFound {
          key: key.to_string(),
        }
      } else {
        Error::Tracker(format!("failed to get issue {}: {}", key, e))
      }
    })?;

    Ok(issue_payload(issue.key, issue.id, issue.fields))
  }

  /// Get every sprint of a board, following pagination
  async fn board_sprints(&self, board_id: u64) -> Result<Vec<Value>> {
    let mut all_sprints = Vec::new();
    let mut start_at = 0u64;

    loop {
      let endpoint = format!(
        "/board/{}/sprint?startAt={}&maxResults={}",
        board_id, start_at, MAX_RESULTS
      );

      let page: ApiSprintPage = self
        .client
        .get("agile", &endpoint)
        .await
        .map_err(|e| Error::Tracker(format!("failed to get sprints of board {}: {}", board_id, e)))?;

      let has_more = page.has_more();
      start_at = page.next_start();
      all_sprints.extend(page.values);

      if !has_more {
        break;
      }
    }

    debug!(board_id, count = all_sprints.len(), "fetched sprints");
    Ok(all_sprints)
  }

  /// Search for issues using JQL
  async fn search_issues(&self, jql: &str) -> Result<Vec<Value>> {
    let search = self.client.search();
    let options = gouqi::SearchOptions::default();

    let stream = search
      .stream(jql, &options)
      .await
      .map_err(|e| Error::Tracker(format!("failed to search issues: {}", e)))?;

    let issues: Vec<Value> = stream
      .map(|issue| issue_payload(issue.key, issue.id, issue.fields))
      .collect()
      .await;

    debug!(count = issues.len(), "search returned issues");
    Ok(issues)
  }
}

fn is_not_found(error: &gouqi::Error) -> bool {
  match error {
    gouqi::Error::NotFound => true,
    gouqi::Error::Fault { code, .. } => code.as_u16() == 404,
    _ => false,
  }
}
