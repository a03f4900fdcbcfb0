use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Internal counters for an [`EventCache`](crate::EventCache).
#[derive(Debug, Default)]
pub(crate) struct Metrics {
  pub(crate) hits: AtomicU64,
  pub(crate) misses: AtomicU64,
  pub(crate) inserts: AtomicU64,
  pub(crate) updates: AtomicU64,
  pub(crate) evicted_by_capacity: AtomicU64,
  pub(crate) invalidations: AtomicU64,
  pub(crate) write_failures: AtomicU64,
  pub(crate) recency_writes: AtomicU64,
}

impl Metrics {
  #[inline]
  pub(crate) fn add(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      updates: self.updates.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      write_failures: self.write_failures.load(Ordering::Relaxed),
      recency_writes: self.recency_writes.load(Ordering::Relaxed),
    }
  }
}

/// A point-in-time snapshot of the cache's counters.
#[derive(Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
  /// Lookups that found an entry.
  pub hits: u64,
  /// Lookups that found nothing.
  pub misses: u64,
  /// hits / (hits + misses).
  pub hit_ratio: f64,
  /// Ids added that were not cached before.
  pub inserts: u64,
  /// Ids added that replaced an existing entry.
  pub updates: u64,
  pub evicted_by_capacity: u64,
  pub invalidations: u64,
  /// Persists that the storage backend rejected.
  pub write_failures: u64,
  /// Writes made only to record recency after a hit.
  pub recency_writes: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format_args!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("updates", &self.updates)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("invalidations", &self.invalidations)
      .field("write_failures", &self.write_failures)
      .field("recency_writes", &self.recency_writes)
      .finish()
  }
}
