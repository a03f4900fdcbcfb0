use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::event::EventDetails;
use crate::lru_list::LruList;

/// The persisted details cache: event records bounded by `max_size` and
/// evicted in least-recently-used order.
///
/// `events` and `lru` always hold the same ids. Mutation goes through the
/// owning [`EventCache`](crate::EventCache), which keeps
/// `len() <= max_size()` after every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailsCache {
  version: String,
  #[serde(default)]
  events: HashMap<String, EventDetails>,
  #[serde(default)]
  lru: LruList<String>,
  #[serde(deserialize_with = "clamped_size")]
  max_size: usize,
  #[serde(default)]
  last_fetched: i64,
}

// A negative stored capacity reads as zero rather than as corruption.
fn clamped_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
  let raw = i64::deserialize(deserializer)?;
  Ok(usize::try_from(raw).unwrap_or(0))
}

impl EventDetailsCache {
  /// An empty cache tagged with `version`.
  pub fn new(version: impl Into<String>, max_size: usize) -> Self {
    Self {
      version: version.into(),
      events: HashMap::new(),
      lru: LruList::new(),
      max_size,
      last_fetched: 0,
    }
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn max_size(&self) -> usize {
    self.max_size
  }

  /// Epoch milliseconds of the last write, `0` if never written.
  pub fn last_fetched(&self) -> i64 {
    self.last_fetched
  }

  pub fn len(&self) -> usize {
    self.lru.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lru.is_empty()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.events.contains_key(id)
  }

  /// Looks up an entry without affecting recency.
  pub fn get(&self, id: &str) -> Option<&EventDetails> {
    self.events.get(id)
  }

  pub fn events(&self) -> &HashMap<String, EventDetails> {
    &self.events
  }

  pub fn lru(&self) -> &LruList<String> {
    &self.lru
  }

  /// Ids ordered from least to most recently used.
  pub fn ids_by_recency(&self) -> Vec<String> {
    self.lru.to_vec()
  }

  /// Whether `events` and `lru` hold exactly the same ids, each entry keyed
  /// by its own id.
  pub fn is_consistent(&self) -> bool {
    self.events.len() == self.lru.len()
      && self.lru.iter().all(|id| self.events.contains_key(id))
      && self.events.iter().all(|(key, details)| *key == details.id)
  }

  pub(crate) fn set_max_size(&mut self, max_size: usize) {
    self.max_size = max_size;
  }

  pub(crate) fn set_last_fetched(&mut self, millis: i64) {
    self.last_fetched = millis;
  }

  /// Restores the 1:1 correspondence between `events` and `lru` after a
  /// load. Entries stored under a key other than their own id are dropped,
  /// as are ids only in `lru`; entries missing from `lru` become the least
  /// recently used, oldest `created_at` first.
  pub(crate) fn reconcile(&mut self) -> bool {
    if self.is_consistent() {
      return false;
    }

    self.events.retain(|key, details| *key == details.id);

    let mut unordered: Vec<&EventDetails> = self
      .events
      .values()
      .filter(|details| !self.lru.contains(details.id.as_str()))
      .collect();
    unordered.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));

    let rebuilt: LruList<String> = unordered
      .into_iter()
      .map(|details| details.id.clone())
      .chain(self.lru.iter().filter(|id| self.events.contains_key(*id)).cloned())
      .collect();
    self.lru = rebuilt;
    true
  }

  /// Inserts or replaces `details` and makes it the most recently used.
  /// Returns `true` if the id was not cached before.
  pub(crate) fn upsert(&mut self, details: EventDetails) -> bool {
    self.lru.touch(details.id.clone());
    self.events.insert(details.id.clone(), details).is_none()
  }

  /// Makes `id` the most recently used, if cached.
  pub(crate) fn touch(&mut self, id: &str) -> bool {
    self.lru.promote(id)
  }

  pub(crate) fn remove(&mut self, id: &str) -> Option<EventDetails> {
    self.lru.remove(id);
    self.events.remove(id)
  }

  /// Evicts least recently used entries until `len() <= max_size()`.
  ///
  /// Every iteration shrinks `lru`, so a capacity of zero drains the cache.
  pub(crate) fn evict_to_capacity(&mut self) -> Vec<EventDetails> {
    let mut evicted = Vec::new();
    while self.lru.len() > self.max_size {
      let Some(id) = self.lru.pop_lru() else {
        break;
      };
      if let Some(details) = self.events.remove(&id) {
        evicted.push(details);
      }
    }
    evicted
  }
}
