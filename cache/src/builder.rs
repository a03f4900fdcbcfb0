use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::handle::EventCache;
use crate::listener::EvictionListener;
use crate::metrics::Metrics;
use crate::prune::{GitHubPayloadPruner, PayloadPruner};
use crate::storage::Storage;
use crate::time::{Clock, SystemClock};
use crate::{
  DEFAULT_MAX_DETAILS, DETAILS_CACHE_KEY, DETAILS_CACHE_VERSION, INDEX_CACHE_KEY,
  LEGACY_CACHE_KEY, LEGACY_CACHE_VERSION,
};

/// When a read hit's recency bump reaches storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyPersistence {
  /// Every hit updates `lastFetched` and rewrites the details cache.
  #[default]
  OnHit,
  /// Hits are queued in memory and applied by the next write, or by
  /// [`EventCache::flush_recency`]. Queued bumps are lost if the process
  /// exits first.
  Deferred,
}

/// Settings for an [`EventCache`]. Deserializable so a host can keep them
/// in its own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
  /// Capacity of the details cache, in entries.
  pub max_size: usize,
  pub details_key: String,
  pub index_key: String,
  /// Key of the pre-versioned single-blob cache, read only by migration.
  pub legacy_key: String,
  /// Schema tag written to, and required of, both current caches.
  pub version: String,
  /// The only legacy schema tag migration accepts.
  pub legacy_version: String,
  pub recency_persistence: RecencyPersistence,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      max_size: DEFAULT_MAX_DETAILS,
      details_key: DETAILS_CACHE_KEY.to_string(),
      index_key: INDEX_CACHE_KEY.to_string(),
      legacy_key: LEGACY_CACHE_KEY.to_string(),
      version: DETAILS_CACHE_VERSION.to_string(),
      legacy_version: LEGACY_CACHE_VERSION.to_string(),
      recency_persistence: RecencyPersistence::OnHit,
    }
  }
}

impl CacheConfig {
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    let keys = [
      ("details", &self.details_key),
      ("index", &self.index_key),
      ("legacy", &self.legacy_key),
    ];
    for (name, key) in keys {
      if key.is_empty() {
        return Err(BuildError::EmptyKey(name));
      }
    }
    if self.details_key == self.index_key || self.details_key == self.legacy_key {
      return Err(BuildError::DuplicateKey(self.details_key.clone()));
    }
    if self.index_key == self.legacy_key {
      return Err(BuildError::DuplicateKey(self.index_key.clone()));
    }
    if self.version.is_empty() {
      return Err(BuildError::EmptyVersion);
    }
    if self.version == self.legacy_version {
      return Err(BuildError::VersionCollision(self.version.clone()));
    }
    Ok(())
  }
}

/// A builder for [`EventCache`] handles.
pub struct EventCacheBuilder<S> {
  storage: S,
  config: CacheConfig,
  pruner: Option<Arc<dyn PayloadPruner>>,
  clock: Option<Arc<dyn Clock>>,
  listener: Option<Arc<dyn EvictionListener>>,
}

impl<S: fmt::Debug> fmt::Debug for EventCacheBuilder<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventCacheBuilder")
      .field("storage", &self.storage)
      .field("config", &self.config)
      .field("has_pruner", &self.pruner.is_some())
      .field("has_clock", &self.clock.is_some())
      .field("has_listener", &self.listener.is_some())
      .finish()
  }
}

impl<S: Storage> EventCacheBuilder<S> {
  pub fn new(storage: S) -> Self {
    Self {
      storage,
      config: CacheConfig::default(),
      pruner: None,
      clock: None,
      listener: None,
    }
  }

  /// Replaces every setting at once.
  pub fn config(mut self, config: CacheConfig) -> Self {
    self.config = config;
    self
  }

  /// Sets the details cache capacity. Zero is accepted and keeps the
  /// details cache empty.
  pub fn max_size(mut self, max_size: usize) -> Self {
    self.config.max_size = max_size;
    self
  }

  pub fn details_key(mut self, key: impl Into<String>) -> Self {
    self.config.details_key = key.into();
    self
  }

  pub fn index_key(mut self, key: impl Into<String>) -> Self {
    self.config.index_key = key.into();
    self
  }

  pub fn legacy_key(mut self, key: impl Into<String>) -> Self {
    self.config.legacy_key = key.into();
    self
  }

  pub fn version(mut self, version: impl Into<String>) -> Self {
    self.config.version = version.into();
    self
  }

  pub fn legacy_version(mut self, version: impl Into<String>) -> Self {
    self.config.legacy_version = version.into();
    self
  }

  pub fn recency_persistence(mut self, mode: RecencyPersistence) -> Self {
    self.config.recency_persistence = mode;
    self
  }

  /// Sets the payload pruner. Defaults to [`GitHubPayloadPruner`].
  pub fn pruner<P>(mut self, pruner: P) -> Self
  where
    P: PayloadPruner + 'static,
  {
    self.pruner = Some(Arc::new(pruner));
    self
  }

  /// Sets the clock used for `lastFetched`. Defaults to [`SystemClock`].
  pub fn clock<C>(mut self, clock: C) -> Self
  where
    C: Clock + 'static,
  {
    self.clock = Some(Arc::new(clock));
    self
  }

  pub fn eviction_listener<L>(mut self, listener: L) -> Self
  where
    L: EvictionListener + 'static,
  {
    self.listener = Some(Arc::new(listener));
    self
  }

  pub fn build(self) -> Result<EventCache<S>, BuildError> {
    self.config.validate()?;

    Ok(EventCache {
      storage: self.storage,
      config: self.config,
      pruner: self
        .pruner
        .unwrap_or_else(|| Arc::new(GitHubPayloadPruner::default())),
      clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
      listener: self.listener,
      metrics: Metrics::default(),
      write_lock: Mutex::new(()),
      pending_touches: Mutex::new(Vec::new()),
    })
  }
}
