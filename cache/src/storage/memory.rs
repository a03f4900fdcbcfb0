use std::collections::HashMap;

use parking_lot::Mutex;

use super::Storage;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
  items: HashMap<String, String>,
  // Bytes currently held, counted as key length + value length.
  used: usize,
  quota: Option<usize>,
  fail_reads: bool,
  fail_writes: bool,
  writes: u64,
}

/// An in-memory [`Storage`] with an optional byte quota.
///
/// Used as the default backend in tests, and as a stand-in for a browser
/// store when the host has no persistent medium. The failure toggles let a
/// caller simulate a store that has become unavailable.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  inner: Mutex<Inner>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a store that rejects writes once `bytes` would be exceeded.
  pub fn with_quota(bytes: usize) -> Self {
    let storage = Self::default();
    storage.inner.lock().quota = Some(bytes);
    storage
  }

  /// Makes every subsequent `get` fail with [`StorageError::Unavailable`].
  pub fn set_fail_reads(&self, fail: bool) {
    self.inner.lock().fail_reads = fail;
  }

  /// Makes every subsequent `set` and `remove` fail with
  /// [`StorageError::Unavailable`].
  pub fn set_fail_writes(&self, fail: bool) {
    self.inner.lock().fail_writes = fail;
  }

  /// Stores `value` verbatim, bypassing quota and failure toggles.
  pub fn insert_raw(&self, key: &str, value: &str) {
    let mut inner = self.inner.lock();
    let added = key.len() + value.len();
    if let Some(old) = inner.items.insert(key.to_string(), value.to_string()) {
      inner.used -= key.len() + old.len();
    }
    inner.used += added;
  }

  /// Returns the stored text under `key`, bypassing failure toggles.
  pub fn raw(&self, key: &str) -> Option<String> {
    self.inner.lock().items.get(key).cloned()
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.inner.lock().items.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.inner.lock().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.lock().items.is_empty()
  }

  /// Bytes currently held by the store.
  pub fn used_bytes(&self) -> usize {
    self.inner.lock().used
  }

  /// Number of successful `set` calls since creation.
  pub fn write_count(&self) -> u64 {
    self.inner.lock().writes
  }
}

impl Storage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let inner = self.inner.lock();
    if inner.fail_reads {
      return Err(StorageError::Unavailable(format!("reads disabled (key '{key}')")));
    }
    Ok(inner.items.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut inner = self.inner.lock();
    if inner.fail_writes {
      return Err(StorageError::Unavailable(format!("writes disabled (key '{key}')")));
    }

    let needed = key.len() + value.len();
    let reclaimed = inner.items.get(key).map_or(0, |old| key.len() + old.len());
    let used_without = inner.used - reclaimed;

    if let Some(quota) = inner.quota {
      let available = quota.saturating_sub(used_without);
      if needed > available {
        return Err(StorageError::QuotaExceeded {
          key: key.to_string(),
          needed,
          available,
        });
      }
    }

    inner.items.insert(key.to_string(), value.to_string());
    inner.used = used_without + needed;
    inner.writes += 1;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut inner = self.inner.lock();
    if inner.fail_writes {
      return Err(StorageError::Unavailable(format!("writes disabled (key '{key}')")));
    }
    if let Some(old) = inner.items.remove(key) {
      inner.used -= key.len() + old.len();
    }
    Ok(())
  }
}
