//! Time-boxed cache for report results.
//!
//! Reports are recomputed from a full snapshot, so repeated dashboard loads
//! are served from here until the entry expires or any write clears the
//! cache.
//!
//! Entries are keyed by the cache generation as well as the report name.
//! [`invalidate_all`](ReportCache::invalidate_all) bumps the generation, so a
//! report computed from data read before a write is stored under a stale
//! generation and never served, even if its insert lands after the clear.

use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use moka::future::Cache;
use serde_json::Value;

/// Default lifetime of a cached report.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

pub struct ReportCache {
  entries:    Cache<(u64, String), Value>,
  generation: AtomicU64,
}

impl ReportCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries:    Cache::builder().time_to_live(ttl).max_capacity(256).build(),
      generation: AtomicU64::new(0),
    }
  }

  /// The current generation. Read it before loading the data a report is
  /// computed from, and pass it to [`insert`](Self::insert).
  pub fn generation(&self) -> u64 { self.generation.load(Ordering::Acquire) }

  pub async fn get(&self, key: &str) -> Option<Value> {
    self.entries.get(&(self.generation(), key.to_owned())).await
  }

  /// Store `value` as computed during `generation`. If a write has cleared
  /// the cache since, the entry is unreachable and simply ages out.
  pub async fn insert(&self, generation: u64, key: String, value: Value) {
    if generation != self.generation() {
      return;
    }
    self.entries.insert((generation, key), value).await;
  }

  /// Drop every cached report; called after each successful write.
  pub fn invalidate_all(&self) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.entries.invalidate_all();
  }
}

impl Default for ReportCache {
  fn default() -> Self { Self::new(DEFAULT_TTL) }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn entries_are_served_until_invalidated() {
    let cache = ReportCache::default();
    assert!(cache.get("orphans").await.is_none());

    cache.insert(cache.generation(), "orphans".into(), json!([1, 2])).await;
    assert_eq!(cache.get("orphans").await, Some(json!([1, 2])));

    cache.invalidate_all();
    assert!(cache.get("orphans").await.is_none());
  }

  #[tokio::test]
  async fn entries_expire() {
    let cache = ReportCache::new(Duration::from_millis(20));
    cache.insert(cache.generation(), "k".into(), json!(1)).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.get("k").await.is_none());
  }

  #[tokio::test]
  async fn results_computed_before_a_write_are_not_served() {
    let cache = ReportCache::default();
    let read_at = cache.generation();
    cache.invalidate_all();
    cache.insert(read_at, "total-subjects".into(), json!({ "total": 1 })).await;
    assert!(cache.get("total-subjects").await.is_none());

    cache.insert(cache.generation(), "total-subjects".into(), json!({ "total": 2 })).await;
    assert_eq!(cache.get("total-subjects").await, Some(json!({ "total": 2 })));
  }
}
