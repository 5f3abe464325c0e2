//! Cache layer that orchestrates read-through caching over a [`CacheStore`].

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, warn};

use super::key::bucket_prefix;
use super::traits::CacheStore;
use crate::error::Result;

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the issue tracker
  Network,
  /// Data read back from the store
  Cache,
}

/// Data plus where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }
}

/// Namespaced, best-effort access to the store.
///
/// Every key is scoped as `<namespace>.<key>`. Store failures never reach the
/// caller: a failed read is a miss and a failed write is logged and dropped.
pub struct CacheLayer {
  store: Box<dyn CacheStore>,
  namespace: String,
}

impl CacheLayer {
  pub fn new(store: Box<dyn CacheStore>, namespace: impl Into<String>) -> Self {
    Self {
      store,
      namespace: namespace.into(),
    }
  }

  fn scoped(&self, key: &str) -> String {
    format!("{}.{}", self.namespace, key)
  }

  pub fn get(&self, key: &str) -> Option<String> {
    let key = self.scoped(key);
    match self.store.get(&key) {
      Ok(value) => value,
      Err(e) => {
        warn!(key, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }

  pub fn set(&self, key: &str, value: &str) {
    let key = self.scoped(key);
    if let Err(e) = self.store.set(&key, value) {
      warn!(key, error = %e, "cache write failed");
    }
  }

  /// Read and deserialize. Undecodable entries count as a miss.
  pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = self.get(key)?;
    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key, error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    match serde_json::to_string(value) {
      Ok(raw) => self.set(key, &raw),
      Err(e) => warn!(key, error = %e, "failed to serialize cache entry"),
    }
  }

  /// Keys under `prefix`, without the namespace.
  pub fn keys(&self, prefix: &str) -> Vec<String> {
    let scoped_prefix = self.scoped(prefix);
    let keys = match self.store.keys_with_prefix(&scoped_prefix) {
      Ok(keys) => keys,
      Err(e) => {
        warn!(prefix = %scoped_prefix, error = %e, "cache key listing failed");
        return Vec::new();
      }
    };

    let namespace_len = self.namespace.len() + 1;
    keys
      .into_iter()
      .map(|key| key[namespace_len..].to_string())
      .collect()
  }

  /// Delete every key under `prefix`. Returns how many were removed.
  pub fn invalidate_prefix(&self, prefix: &str) -> usize {
    let mut removed = 0;
    for key in self.keys(prefix) {
      let scoped = self.scoped(&key);
      match self.store.delete(&scoped) {
        Ok(()) => removed += 1,
        Err(e) => warn!(key = %scoped, error = %e, "cache delete failed"),
      }
    }
    debug!(prefix, removed, "invalidated cache entries");
    removed
  }

  /// Forget every time bucket of `<namespace>.<id>`.
  pub fn invalidate(&self, namespace: &str, id: &str) -> usize {
    self.invalidate_prefix(&bucket_prefix(namespace, id))
  }

  /// Read-through lookup.
  ///
  /// 1. Unless `refresh` is set, return the cached value at `key` if present
  /// 2. Otherwise call `fetcher`
  /// 3. If it produced a value, drop everything under `stale_prefix` and store
  ///    the value at `key`
  ///
  /// Fetch errors propagate and leave the cache untouched. A fetch that
  /// produces nothing yields `Ok(None)` and also leaves the cache untouched.
  pub async fn read_through<T, F, Fut>(
    &self,
    key: &str,
    stale_prefix: &str,
    refresh: bool,
    fetcher: F,
  ) -> Result<Option<CacheResult<T>>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
  {
    if !refresh {
      if let Some(cached) = self.get_json::<T>(key) {
        debug!(key, "cache hit");
        return Ok(Some(CacheResult::from_cache(cached)));
      }
    }

    debug!(key, refresh, "fetching from issue tracker");
    let Some(data) = fetcher().await? else {
      return Ok(None);
    };

    self.invalidate_prefix(stale_prefix);
    self.set_json(key, &data);
    Ok(Some(CacheResult::from_network(data)))
  }
}
