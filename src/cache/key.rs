//! Cache key scheme.
//!
//! The store has no per-key expiry, so time-limited entries embed a coarse time
//! window in their key instead. A new window means a new key; stale windows are
//! removed by deleting everything under the `<namespace>.<id>.` prefix.

use chrono::{DateTime, NaiveDate, Utc};

/// Key for the time window containing `now`:
/// `<namespace>.<id>.<floor(unix_seconds / ttl_seconds)>`.
///
/// A TTL of zero is treated as one second; TTLs beyond `i64::MAX` saturate.
pub fn bucket_key(namespace: &str, id: &str, ttl_seconds: u64, now: DateTime<Utc>) -> String {
  let ttl = i64::try_from(ttl_seconds.max(1)).unwrap_or(i64::MAX);
  let epoch = now.timestamp().div_euclid(ttl);
  format!("{}{}", bucket_prefix(namespace, id), epoch)
}

/// Prefix shared by every bucket of `<namespace>.<id>`.
pub fn bucket_prefix(namespace: &str, id: &str) -> String {
  format!("{}.{}.", namespace, id)
}

/// Key valid for one calendar day: `<namespace>.<YYYY-MM-DD>`.
pub fn daily_key(namespace: &str, date: NaiveDate) -> String {
  format!("{}.{}", namespace, date.format("%Y-%m-%d"))
}
