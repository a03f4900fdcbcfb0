use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::event::GitHubEvent;

/// The persisted index cache: every event id ever recorded, without details.
///
/// Unbounded; it answers "has this id been seen" for ids the details cache
/// has long since evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexCache {
  version: String,
  #[serde(default)]
  ids: Vec<String>,
  #[serde(default)]
  total_count: u64,
  #[serde(default)]
  last_fetched: i64,
}

impl IndexCache {
  /// An empty index tagged with `version`.
  pub fn new(version: impl Into<String>) -> Self {
    Self {
      version: version.into(),
      ids: Vec::new(),
      total_count: 0,
      last_fetched: 0,
    }
  }

  /// Builds an index over `events`, keeping the first occurrence of each id.
  pub fn from_events(
    version: impl Into<String>,
    events: &[GitHubEvent],
    total_count: u64,
    now_millis: i64,
  ) -> Self {
    Self::from_ids(
      version,
      events.iter().map(|event| event.id.clone()),
      total_count,
      now_millis,
    )
  }

  /// Same as [`IndexCache::from_events`], over bare ids.
  pub fn from_ids<I>(version: impl Into<String>, ids: I, total_count: u64, now_millis: i64) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    let mut seen = AHashSet::new();
    let ids = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();

    Self {
      version: version.into(),
      ids,
      total_count,
      last_fetched: now_millis,
    }
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// Known ids, in the order they were recorded.
  pub fn ids(&self) -> &[String] {
    &self.ids
  }

  /// The total the upstream source reported, which may exceed `ids().len()`.
  pub fn total_count(&self) -> u64 {
    self.total_count
  }

  pub fn last_fetched(&self) -> i64 {
    self.last_fetched
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.ids.iter().any(|known| known == id)
  }
}
