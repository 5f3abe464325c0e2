//! Local cache for data fetched from the issue tracker.
//!
//! This module provides a Jira-agnostic caching mechanism that:
//! - Stores JSON strings under namespaced keys in a small key-value store
//! - Approximates TTLs with time-bucketed keys (see [`key`])
//! - Forgets stale buckets by prefix deletion
//! - Falls back to a no-op store when the database cannot be opened

pub mod key;
mod layer;
mod storage;
mod traits;

pub use key::{bucket_key, bucket_prefix, daily_key};
pub use layer::{CacheLayer, CacheResult, CacheSource};
pub use storage::{NullStore, SqliteStore};
pub use traits::CacheStore;
