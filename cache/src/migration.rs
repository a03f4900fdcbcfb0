//! One-shot upgrade from the unversioned single-blob cache.
//!
//! The legacy blob holds full events. Migration records every legacy id in
//! the index cache, even for events that no longer decode, keeps details
//! only for the first `max_size` events, and removes the legacy key last, so
//! an interrupted run is retried on the next call.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::MigrationError;
use crate::event::{EventDetails, GitHubEvent};
use crate::handle::EventCache;
use crate::listener::EvictionReason;
use crate::storage::Storage;

/// What [`EventCache::migrate_old_cache`] did.
#[derive(Debug)]
pub enum MigrationOutcome {
  /// No legacy blob was stored (or it could not be decoded).
  NoLegacyCache,
  /// A legacy blob exists but carries a version other than the accepted one.
  /// It is left untouched.
  UnsupportedVersion(Option<String>),
  /// The legacy blob was migrated and removed.
  Migrated {
    /// Distinct ids written to the index cache.
    indexed: usize,
    /// Events written to the details cache.
    detailed: usize,
  },
  /// A storage step failed; the legacy blob is still in place.
  Aborted(MigrationError),
}

impl MigrationOutcome {
  pub fn is_migrated(&self) -> bool {
    matches!(self, MigrationOutcome::Migrated { .. })
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCache {
  #[serde(default)]
  version: Option<Value>,
  #[serde(default)]
  events: Option<Vec<Value>>,
  #[serde(default)]
  total_count: Option<u64>,
}

impl LegacyCache {
  // Numeric tags such as 4.0 compare by their JSON text.
  fn version_tag(&self) -> Option<String> {
    match &self.version {
      Some(Value::String(tag)) => Some(tag.clone()),
      Some(Value::Number(n)) => n.as_f64().map(|v| {
        if v.fract() == 0.0 {
          format!("{v:.1}")
        } else {
          v.to_string()
        }
      }),
      Some(Value::Null) | None => None,
      Some(other) => Some(other.to_string()),
    }
  }
}

// Ids are read off the raw entries so an event that no longer decodes is
// still indexed. Numeric ids are kept as their decimal text.
fn legacy_id(raw: &Value) -> Option<String> {
  match raw.get("id")? {
    Value::String(id) => Some(id.clone()),
    Value::Number(id) => Some(id.to_string()),
    _ => None,
  }
}

// Only full events can be turned into details; the rest are skipped.
fn decode_events<'a>(raw: impl Iterator<Item = &'a Value>) -> Vec<GitHubEvent> {
  let mut skipped = 0usize;
  let events = raw
    .filter_map(|value| match GitHubEvent::deserialize(value) {
      Ok(event) => Some(event),
      Err(_) => {
        skipped += 1;
        None
      }
    })
    .collect();
  if skipped > 0 {
    warn!(skipped, "legacy events too incomplete to keep details for");
  }
  events
}

impl<S: Storage> EventCache<S> {
  /// Moves a legacy cache blob into the index and details caches.
  ///
  /// A no-op when there is no legacy blob or its version is not the
  /// configured legacy version. On any storage failure the legacy blob is
  /// kept and the call can simply be repeated.
  pub fn migrate_old_cache(&self) -> MigrationOutcome {
    let guard = self.write_lock.lock();
    let mut evicted = Vec::new();
    let outcome = self
      .migrate_locked(&mut evicted)
      .unwrap_or_else(MigrationOutcome::Aborted);
    drop(guard);

    self.notify(evicted, EvictionReason::Capacity);

    let key = self.config.legacy_key.as_str();
    match &outcome {
      MigrationOutcome::NoLegacyCache => info!(key, "no legacy cache to migrate"),
      MigrationOutcome::UnsupportedVersion(found) => info!(
        key,
        found = found.as_deref().unwrap_or("<none>"),
        expected = %self.config.legacy_version,
        "legacy cache version not supported, leaving it in place"
      ),
      MigrationOutcome::Migrated { indexed, detailed } => {
        info!(key, indexed, detailed, "migrated legacy cache")
      }
      MigrationOutcome::Aborted(err) => {
        warn!(key, error = %err, "legacy cache migration aborted, will retry")
      }
    }
    outcome
  }

  fn migrate_locked(
    &self,
    evicted: &mut Vec<EventDetails>,
  ) -> Result<MigrationOutcome, MigrationError> {
    let key = self.config.legacy_key.as_str();
    let raw = match self.storage.get(key).map_err(MigrationError::LegacyRead)? {
      Some(raw) => raw,
      None => return Ok(MigrationOutcome::NoLegacyCache),
    };

    let legacy: LegacyCache = match serde_json::from_str(&raw) {
      Ok(legacy) => legacy,
      Err(err) => {
        warn!(key, error = %err, "legacy cache is corrupt, ignoring it");
        return Ok(MigrationOutcome::NoLegacyCache);
      }
    };

    let version = legacy.version_tag();
    if version.as_deref() != Some(self.config.legacy_version.as_str()) {
      return Ok(MigrationOutcome::UnsupportedVersion(version));
    }

    let raw_events = legacy.events.unwrap_or_default();
    let total_count = legacy.total_count.unwrap_or(raw_events.len() as u64);

    let ids = raw_events.iter().filter_map(legacy_id);
    let indexed = self
      .write_index_locked(ids, total_count)
      .ok_or(MigrationError::IndexWrite)?;

    let recent: Vec<EventDetails> = decode_events(raw_events.iter().take(self.config.max_size))
      .iter()
      .map(|event| self.to_details(event))
      .collect();
    let detailed = recent.len();

    let (ok, mut dropped) = self.insert_batch_locked(recent);
    if !ok {
      return Err(MigrationError::DetailsWrite);
    }
    evicted.append(&mut dropped);

    self.storage.remove(key).map_err(MigrationError::LegacyRemove)?;

    Ok(MigrationOutcome::Migrated { indexed, detailed })
  }
}
