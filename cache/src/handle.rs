use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::builder::{CacheConfig, EventCacheBuilder, RecencyPersistence};
use crate::details::EventDetailsCache;
use crate::event::{EventDetails, GitHubEvent};
use crate::index::IndexCache;
use crate::listener::{EvictionListener, EvictionReason};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::prune::PayloadPruner;
use crate::storage::{safe_get_item, safe_remove_item, safe_set_item, Storage};
use crate::time::Clock;

/// The public face of the two caches.
///
/// Every operation reads the current state from storage, applies its change
/// and writes it back; no cache state is held in memory between calls apart
/// from deferred recency bumps. Storage failures never surface as errors:
/// reads degrade to a miss and writes report `false`.
///
/// Read-modify-write cycles are serialized within one handle. Two handles
/// (or two processes) over the same storage can still overwrite each other.
pub struct EventCache<S: Storage> {
  pub(crate) storage: S,
  pub(crate) config: CacheConfig,
  pub(crate) pruner: Arc<dyn PayloadPruner>,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) listener: Option<Arc<dyn EvictionListener>>,
  pub(crate) metrics: Metrics,
  pub(crate) write_lock: Mutex<()>,
  pub(crate) pending_touches: Mutex<Vec<String>>,
}

impl<S: Storage + fmt::Debug> fmt::Debug for EventCache<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventCache")
      .field("storage", &self.storage)
      .field("config", &self.config)
      .field("has_listener", &self.listener.is_some())
      .finish_non_exhaustive()
  }
}

impl<S: Storage> EventCache<S> {
  pub fn builder(storage: S) -> EventCacheBuilder<S> {
    EventCacheBuilder::new(storage)
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }

  /// The current details cache as stored, or a fresh one if storage holds
  /// nothing usable. Reading never writes.
  pub fn details_cache(&self) -> EventDetailsCache {
    self.load_details()
  }

  /// Looks up `id` and, on a hit, marks it most recently used.
  ///
  /// With [`RecencyPersistence::OnHit`] the bump is written immediately; a
  /// failed write is logged and the details are still returned. A miss never
  /// writes.
  pub fn get_event_details(&self, id: &str) -> Option<EventDetails> {
    let guard = self.write_lock.lock();
    let mut cache = self.load_details();

    let Some(details) = cache.get(id).cloned() else {
      Metrics::add(&self.metrics.misses, 1);
      return None;
    };
    Metrics::add(&self.metrics.hits, 1);

    match self.config.recency_persistence {
      RecencyPersistence::OnHit => {
        cache.touch(id);
        Metrics::add(&self.metrics.recency_writes, 1);
        let (_, evicted) = self.commit_details(&mut cache);
        drop(guard);
        self.notify(evicted, EvictionReason::Capacity);
      }
      RecencyPersistence::Deferred => {
        self.pending_touches.lock().push(id.to_string());
      }
    }

    Some(details)
  }

  /// Prunes `event`, stores it as the most recently used entry and evicts
  /// down to capacity. Returns whether the write succeeded.
  pub fn add_event_details(&self, event: &GitHubEvent) -> bool {
    self.insert_batch(vec![self.to_details(event)])
  }

  /// Like [`add_event_details`](Self::add_event_details) for many events,
  /// with a single eviction pass after every event is inserted. Later events
  /// in `events` end up more recent than earlier ones.
  pub fn add_many_event_details(&self, events: &[GitHubEvent]) -> bool {
    let batch = events.iter().map(|event| self.to_details(event)).collect();
    self.insert_batch(batch)
  }

  /// Removes a single entry from the details cache. Returns whether the
  /// write succeeded; an id that is not cached needs no write and yields
  /// `true`.
  pub fn invalidate(&self, id: &str) -> bool {
    let guard = self.write_lock.lock();
    let mut cache = self.load_details();

    let Some(removed) = cache.remove(id) else {
      return true;
    };
    Metrics::add(&self.metrics.invalidations, 1);

    let (ok, evicted) = self.commit_details(&mut cache);
    drop(guard);

    if ok {
      self.notify(vec![removed], EvictionReason::Invalidated);
    }
    self.notify(evicted, EvictionReason::Capacity);
    ok
  }

  /// Writes recency bumps queued under [`RecencyPersistence::Deferred`].
  /// Returns `true` when nothing was queued.
  pub fn flush_recency(&self) -> bool {
    let guard = self.write_lock.lock();
    if self.pending_touches.lock().is_empty() {
      return true;
    }

    let mut cache = self.load_details();
    self.apply_pending_touches(&mut cache);
    Metrics::add(&self.metrics.recency_writes, 1);
    let (ok, evicted) = self.commit_details(&mut cache);
    drop(guard);

    self.notify(evicted, EvictionReason::Capacity);
    ok
  }

  /// Removes both the index and the details cache from storage.
  /// Idempotent; removal failures are logged.
  pub fn clear_all_caches(&self) {
    let _guard = self.write_lock.lock();
    self.pending_touches.lock().clear();
    safe_remove_item(&self.storage, &self.config.index_key);
    safe_remove_item(&self.storage, &self.config.details_key);
    debug!(
      index_key = %self.config.index_key,
      details_key = %self.config.details_key,
      "cleared caches"
    );
  }

  /// Overwrites the index cache with the ids of `events`. Returns whether
  /// the write succeeded.
  pub fn update_index_cache(&self, events: &[GitHubEvent], total_count: u64) -> bool {
    let _guard = self.write_lock.lock();
    let ids = events.iter().map(|event| event.id.clone());
    self.write_index_locked(ids, total_count).is_some()
  }

  /// The current index cache as stored, or an empty one.
  pub fn index_cache(&self) -> IndexCache {
    match safe_get_item::<IndexCache>(&self.storage, &self.config.index_key) {
      Some(index) if index.version() == self.config.version => index,
      Some(index) => {
        debug!(
          found = index.version(),
          expected = %self.config.version,
          "index cache version mismatch, treating as absent"
        );
        IndexCache::new(&self.config.version)
      }
      None => IndexCache::new(&self.config.version),
    }
  }

  /// Whether `id` was ever recorded in the index cache.
  pub fn has_seen(&self, id: &str) -> bool {
    self.index_cache().contains(id)
  }

  // --- internals ---

  pub(crate) fn to_details(&self, event: &GitHubEvent) -> EventDetails {
    EventDetails::from_event(event, self.pruner.prune(event))
  }

  pub(crate) fn load_details(&self) -> EventDetailsCache {
    let config = &self.config;
    let mut cache = match safe_get_item::<EventDetailsCache>(&self.storage, &config.details_key) {
      Some(cache) if cache.version() == config.version => cache,
      Some(cache) => {
        debug!(
          found = cache.version(),
          expected = %config.version,
          "details cache version mismatch, treating as absent"
        );
        EventDetailsCache::new(&config.version, config.max_size)
      }
      None => EventDetailsCache::new(&config.version, config.max_size),
    };

    if cache.reconcile() {
      debug!(key = %config.details_key, "repaired inconsistent details cache");
    }
    cache.set_max_size(config.max_size);
    cache
  }

  fn insert_batch(&self, batch: Vec<EventDetails>) -> bool {
    let guard = self.write_lock.lock();
    let (ok, evicted) = self.insert_batch_locked(batch);
    drop(guard);

    self.notify(evicted, EvictionReason::Capacity);
    ok
  }

  /// Caller must hold `write_lock`. Evicted entries are returned only if the
  /// write succeeded.
  pub(crate) fn insert_batch_locked(&self, batch: Vec<EventDetails>) -> (bool, Vec<EventDetails>) {
    let mut cache = self.load_details();
    self.apply_pending_touches(&mut cache);

    for details in batch {
      if cache.upsert(details) {
        Metrics::add(&self.metrics.inserts, 1);
      } else {
        Metrics::add(&self.metrics.updates, 1);
      }
    }

    self.commit_details(&mut cache)
  }

  /// Caller must hold `write_lock`. Returns the number of distinct ids
  /// written, or `None` if the write failed.
  pub(crate) fn write_index_locked<I>(&self, ids: I, total_count: u64) -> Option<usize>
  where
    I: IntoIterator<Item = String>,
  {
    let index = IndexCache::from_ids(&self.config.version, ids, total_count, self.clock.now_millis());
    if safe_set_item(&self.storage, &self.config.index_key, &index) {
      Some(index.len())
    } else {
      Metrics::add(&self.metrics.write_failures, 1);
      None
    }
  }

  // Evicts to capacity, stamps `lastFetched` and persists. Evictions are
  // reported only once they have reached storage.
  fn commit_details(&self, cache: &mut EventDetailsCache) -> (bool, Vec<EventDetails>) {
    let evicted = cache.evict_to_capacity();
    cache.set_last_fetched(self.clock.now_millis());

    let ok = safe_set_item(&self.storage, &self.config.details_key, &*cache);
    if !ok {
      Metrics::add(&self.metrics.write_failures, 1);
      return (false, Vec::new());
    }

    if !evicted.is_empty() {
      Metrics::add(&self.metrics.evicted_by_capacity, evicted.len() as u64);
      debug!(
        evicted = evicted.len(),
        remaining = cache.len(),
        max_size = cache.max_size(),
        "evicted least recently used details"
      );
    }
    (true, evicted)
  }

  fn apply_pending_touches(&self, cache: &mut EventDetailsCache) {
    let pending = std::mem::take(&mut *self.pending_touches.lock());
    for id in &pending {
      cache.touch(id);
    }
  }

  pub(crate) fn notify(&self, entries: Vec<EventDetails>, reason: EvictionReason) {
    if let Some(listener) = &self.listener {
      for details in &entries {
        listener.on_evict(&details.id, details, reason);
      }
    }
  }
}
