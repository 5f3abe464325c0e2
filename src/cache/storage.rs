//! Cache store implementations: SQLite on disk, and a no-op fallback.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::traits::CacheStore;
use crate::error::{Error, Result};

/// Schema for the key-value table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-based key-value store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Store(format!("failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      Error::Store(format!(
        "failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;

    debug!(path = %path.display(), "opened cache database");
    Self::with_connection(conn)
  }

  /// Store that lives only as long as the process.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| Error::Store(format!("failed to open in-memory cache: {}", e)))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| Error::Store(format!("failed to run cache migrations: {}", e)))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// `<data dir>/jt/cache.db`.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::Store("could not determine data directory".to_string()))?;

    Ok(data_dir.join("jt").join("cache.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Store(format!("lock poisoned: {}", e)))
  }
}

impl CacheStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.lock()?;
    conn
      .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get(0)
      })
      .optional()
      .map_err(|e| Error::Store(format!("failed to read {}: {}", key, e)))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv (key, value, stored_at) VALUES (?1, ?2, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| Error::Store(format!("failed to write {}: {}", key, e)))?;
    Ok(())
  }

  fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
    let conn = self.lock()?;
    // substr() instead of LIKE so '_' and '%' in keys match literally.
    let mut stmt = conn
      .prepare("SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
      .map_err(|e| Error::Store(format!("failed to prepare key listing: {}", e)))?;

    let keys = stmt
      .query_map(params![prefix], |row| row.get(0))
      .map_err(|e| Error::Store(format!("failed to list keys: {}", e)))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| Error::Store(format!("failed to list keys: {}", e)))?;

    Ok(keys)
  }

  fn delete(&self, key: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute("DELETE FROM kv WHERE key = ?1", params![key])
      .map_err(|e| Error::Store(format!("failed to delete {}: {}", key, e)))?;
    Ok(())
  }
}

/// Store used when the database cannot be opened.
///
/// Reads always miss and writes are discarded. The first write logs a single
/// warning so the user knows nothing is being persisted.
#[derive(Default)]
pub struct NullStore {
  warned: AtomicBool,
}

impl NullStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn offline_notice(&self) {
    if !self.warned.swap(true, Ordering::Relaxed) {
      warn!("cache store is unavailable; results will not be cached between runs");
    }
  }

  #[cfg(test)]
  fn has_warned(&self) -> bool {
    self.warned.load(Ordering::Relaxed)
  }
}

impl CacheStore for NullStore {
  fn get(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> Result<()> {
    self.offline_notice();
    Ok(()) // Discard
  }

  fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn delete(&self, _key: &str) -> Result<()> {
    self.offline_notice();
    Ok(())
  }
}
