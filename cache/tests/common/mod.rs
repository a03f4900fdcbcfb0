#![allow(dead_code)]

use std::sync::Arc;

use feed_cache::{EventCache, GitHubEvent, ManualClock, MemoryStorage, Repo};
use serde_json::{json, Value};

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub fn event(id: &str) -> GitHubEvent {
  event_with_payload(id, json!({ "action": "started" }))
}

pub fn event_with_payload(id: &str, payload: Value) -> GitHubEvent {
  GitHubEvent {
    id: id.to_string(),
    kind: "WatchEvent".to_string(),
    actor: None,
    repo: Repo {
      id: None,
      name: format!("owner/repo-{id}"),
      url: None,
    },
    payload,
    public: true,
    created_at: "2024-05-01T12:00:00Z".to_string(),
  }
}

pub fn events(ids: &[&str]) -> Vec<GitHubEvent> {
  ids.iter().map(|id| event(id)).collect()
}

pub fn numbered_events(count: usize) -> Vec<GitHubEvent> {
  (0..count).map(|i| event(&format!("e{i}"))).collect()
}

// Helper to build a cache over fresh in-memory storage with a controllable clock.
pub fn build_test_cache(max_size: usize) -> (EventCache<MemoryStorage>, Arc<ManualClock>) {
  let clock = Arc::new(ManualClock::new(START_MILLIS));
  let cache = EventCache::builder(MemoryStorage::new())
    .max_size(max_size)
    .clock(clock.clone())
    .build()
    .unwrap();
  (cache, clock)
}

pub fn build_cache_over(storage: Arc<MemoryStorage>, max_size: usize) -> EventCache<Arc<MemoryStorage>> {
  EventCache::builder(storage)
    .max_size(max_size)
    .clock(ManualClock::new(START_MILLIS))
    .build()
    .unwrap()
}

pub fn recency<S: feed_cache::Storage>(cache: &EventCache<S>) -> Vec<String> {
  cache.details_cache().ids_by_recency()
}
