use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{Error, Result};

/// Seconds a cached issue list stays current.
pub const DEFAULT_CACHE_TTL: u64 = 14_400;
pub const DEFAULT_NAMESPACE: &str = "jt";
pub const DEFAULT_IGNORE_BRANCHES: &[&str] = &["master", "develop"];

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
  /// Auto-detect based on URL: .atlassian.net = cloud, else on-premise
  #[default]
  Auto,
  /// Jira Cloud - uses Basic auth (email + API token as password)
  Cloud,
  /// Jira On-premise - uses Bearer auth (PAT)
  Onpremise,
}

impl AuthType {
  /// Resolve `Auto` against the site URL.
  pub fn resolve(self, url: &Url) -> AuthType {
    match self {
      AuthType::Auto => {
        let cloud = url
          .host_str()
          .map(|h| h.ends_with(".atlassian.net"))
          .unwrap_or(false);
        if cloud {
          AuthType::Cloud
        } else {
          AuthType::Onpremise
        }
      }
      other => other,
    }
  }
}

/// How the user authenticates against Jira.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
  /// API token (Cloud) or personal access token (on-premise)
  Token(Secret),
  /// Account password, always sent with Basic auth
  Password(Secret),
}

/// A credential that never shows up in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Secret(***)")
  }
}

/// Config file contents. Every field is optional here; [`Config`] holds the
/// validated result after environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
  #[serde(default)]
  pub jira: JiraFileConfig,
  pub default_project: Option<String>,
  /// Scrum board (RapidView) id
  pub board_id: Option<u64>,
  #[serde(default)]
  pub cache: CacheFileConfig,
  /// Branches that never map to an issue
  pub ignore_branches: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraFileConfig {
  pub url: Option<String>,
  pub email: Option<String>,
  #[serde(default)]
  pub auth_type: AuthType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheFileConfig {
  pub ttl_seconds: Option<u64>,
  pub namespace: Option<String>,
  pub path: Option<PathBuf>,
}

impl FileConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./jt.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jt/config.yaml
  ///
  /// Having no file at all is fine; everything can come from the environment.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Config(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jt.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jt").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      Error::Config(format!(
        "failed to read config file {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::parse(&contents)
      .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents)
      .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))
  }
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
  /// Site root, always ending in `/`
  pub url: Url,
  pub user: String,
  pub credential: Credential,
  pub auth_type: AuthType,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
  pub ttl_seconds: u64,
  pub namespace: String,
  /// Database file; `None` means the default data directory
  pub path: Option<PathBuf>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
  pub jira: JiraConfig,
  pub default_project: String,
  pub board_id: u64,
  pub cache: CacheConfig,
  pub ignore_branches: Vec<String>,
}

impl Config {
  /// Read the config file (if any) and apply environment overrides.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let file = FileConfig::load(explicit_path)?;
    Self::from_sources(file, |name| std::env::var(name).ok())
  }

  /// Merge file values with `env` lookups and validate.
  ///
  /// Environment variables win over the file. Blank values count as unset.
  pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let var = |name: &str| {
      env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    };

    let site = var("JIRA_SITE")
      .or(file.jira.url)
      .ok_or_else(|| missing("Jira site URL", "jira.url", "JIRA_SITE"))?;
    let url = parse_site_url(&site)?;

    let user = var("JIRA_USER")
      .or(file.jira.email)
      .ok_or_else(|| missing("Jira user", "jira.email", "JIRA_USER"))?;

    let credential = var("JT_JIRA_TOKEN")
      .or_else(|| var("JIRA_API_TOKEN"))
      .map(|t| Credential::Token(Secret::new(t)))
      .or_else(|| var("JIRA_PASSWORD").map(|p| Credential::Password(Secret::new(p))))
      .ok_or_else(|| {
        Error::Config(
          "Jira API token not found. Set JT_JIRA_TOKEN, JIRA_API_TOKEN or JIRA_PASSWORD".to_string(),
        )
      })?;

    let default_project = var("JIRA_DEFAULT_PROJECT_KEY")
      .or(file.default_project)
      .map(|p| p.trim().to_uppercase())
      .filter(|p| !p.is_empty())
      .ok_or_else(|| {
        missing(
          "default project key",
          "default_project",
          "JIRA_DEFAULT_PROJECT_KEY",
        )
      })?;

    let board_id = match var("JIRA_RAPIDVIEW_ID") {
      Some(raw) => parse_number("JIRA_RAPIDVIEW_ID", &raw)?,
      None => file
        .board_id
        .ok_or_else(|| missing("board id", "board_id", "JIRA_RAPIDVIEW_ID"))?,
    };

    let ttl_seconds = match var("JIRA_CACHE_TIME") {
      Some(raw) => parse_number("JIRA_CACHE_TIME", &raw)?,
      None => file.cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL),
    };
    // Zero would mean "never reuse"; treat it as unset.
    let ttl_seconds = if ttl_seconds == 0 {
      DEFAULT_CACHE_TTL
    } else {
      ttl_seconds
    };

    let ignore_branches = match var("JIRA_IGNORE_BRANCHES") {
      Some(raw) => raw
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(String::from)
        .collect(),
      None => file.ignore_branches.unwrap_or_else(|| {
        DEFAULT_IGNORE_BRANCHES
          .iter()
          .map(|b| b.to_string())
          .collect()
      }),
    };

    Ok(Config {
      jira: JiraConfig {
        url,
        user,
        credential,
        auth_type: file.jira.auth_type,
      },
      default_project,
      board_id,
      cache: CacheConfig {
        ttl_seconds,
        namespace: file
          .cache
          .namespace
          .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        path: file.cache.path,
      },
      ignore_branches,
    })
  }

  /// Browser URL for an issue.
  pub fn issue_url(&self, key: &str) -> Result<Url> {
    self
      .jira
      .url
      .join(&format!("browse/{}", key))
      .map_err(|e| Error::Config(format!("cannot build issue URL for {}: {}", key, e)))
  }

  /// Browser URL for the team's board.
  pub fn board_url(&self) -> Result<Url> {
    let mut url = self
      .jira
      .url
      .join("secure/RapidBoard.jspa")
      .map_err(|e| Error::Config(format!("cannot build board URL: {}", e)))?;
    url
      .query_pairs_mut()
      .append_pair("rapidView", &self.board_id.to_string())
      .append_pair("projectKey", &self.default_project);
    Ok(url)
  }
}

fn missing(what: &str, file_key: &str, env_name: &str) -> Error {
  Error::Config(format!(
    "missing {} (set `{}` in the config file or {})",
    what, file_key, env_name
  ))
}

fn parse_number(name: &str, raw: &str) -> Result<u64> {
  raw
    .parse()
    .map_err(|_| Error::Config(format!("{} must be a whole number, got {:?}", name, raw)))
}

fn parse_site_url(raw: &str) -> Result<Url> {
  let mut url = Url::parse(raw)
    .map_err(|e| Error::Config(format!("invalid Jira site URL {:?}: {}", raw, e)))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}
