use thiserror::Error;

/// Errors surfaced by the core library.
#[derive(Debug, Error)]
pub enum Error {
  /// A required setting is missing or malformed.
  #[error("configuration error: {0}")]
  Config(String),

  /// A value does not have the shape a record or payload needs.
  #[error("invalid record source: {0}")]
  Argument(String),

  #[error("issue {key} not found")]
  NotFound { key: String },

  #[error("no issue given and none could be derived from the current branch")]
  MissingIssueKey,

  #[error("issue tracker request failed: {0}")]
  Tracker(String),

  /// Only produced while opening the live store.
  #[error("cache store unavailable: {0}")]
  Store(String),

  /// Only produced while opening the live version-control context.
  #[error("version control unavailable: {0}")]
  Vcs(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
