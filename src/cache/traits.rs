//! Key-value contract the cache layer is built on.

use crate::error::Result;

/// Minimal string key-value store.
///
/// There are two implementations: [`SqliteStore`](super::SqliteStore) backed by
/// a database file, and [`NullStore`](super::NullStore) used when that file
/// cannot be opened. Callers hold a `Box<dyn CacheStore>` and never check which
/// one they got.
pub trait CacheStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// All keys starting with `prefix`, compared literally.
  fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

  fn delete(&self, key: &str) -> Result<()>;
}
