use std::fmt;

use crate::event::EventDetails;

/// Describes the reason an entry was removed from the details cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
  /// The entry was the least recently used while the cache was over capacity.
  Capacity,
  /// The entry was removed through [`EventCache::invalidate`](crate::EventCache::invalidate).
  Invalidated,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Capacity => write!(f, "evicted due to capacity"),
      EvictionReason::Invalidated => write!(f, "manually invalidated"),
    }
  }
}

/// A listener that can be registered with the cache to receive notifications
/// when entries leave the details cache.
///
/// `on_evict` runs synchronously on the caller's thread, once the write that
/// removed the entry has succeeded and the cache lock is released. Entries
/// dropped by a failed write are not reported.
pub trait EvictionListener: Send + Sync {
  fn on_evict(&self, id: &str, details: &EventDetails, reason: EvictionReason);
}

impl<F> EvictionListener for F
where
  F: Fn(&str, &EventDetails, EvictionReason) + Send + Sync,
{
  fn on_evict(&self, id: &str, details: &EventDetails, reason: EvictionReason) {
    self(id, details, reason)
  }
}
