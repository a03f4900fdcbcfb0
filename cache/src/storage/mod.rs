//! The key/value store the caches persist into.
//!
//! A [`Storage`] holds JSON text under string keys, the same contract a
//! browser's local storage offers. Backends report failures through
//! [`StorageError`]; the `safe_*` helpers are the only way the caches talk to
//! a backend, and they turn every failure into "absent" or `false` after
//! logging it.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StorageError;

/// A synchronous key/value store holding JSON text.
pub trait Storage: Send + Sync {
  /// Returns the raw value stored under `key`, or `None` if there is none.
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Stores `value` under `key`, replacing any previous value.
  ///
  /// On failure the previous value must be left untouched.
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

  /// Removes `key`. Removing an absent key is not an error.
  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: Storage + ?Sized> Storage for &T {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    (**self).set(key, value)
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    (**self).remove(key)
  }
}

impl<T: Storage + ?Sized> Storage for std::sync::Arc<T> {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    (**self).set(key, value)
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    (**self).remove(key)
  }
}

/// Reads and decodes the value under `key`.
///
/// Read failures and undecodable values are logged and reported as absent.
pub fn safe_get_item<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
  let raw = match storage.get(key) {
    Ok(Some(raw)) => raw,
    Ok(None) => return None,
    Err(err) => {
      warn!(key, error = %err, "storage read failed, treating as absent");
      return None;
    }
  };

  match serde_json::from_str(&raw) {
    Ok(value) => Some(value),
    Err(source) => {
      let err = StorageError::Serialization {
        key: key.to_string(),
        source,
      };
      warn!(key, error = %err, "stored value is corrupt, treating as absent");
      None
    }
  }
}

/// Encodes `value` and writes it under `key`. Returns whether the write
/// succeeded; failures are logged.
pub fn safe_set_item<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> bool {
  let raw = match serde_json::to_string(value) {
    Ok(raw) => raw,
    Err(source) => {
      let err = StorageError::Serialization {
        key: key.to_string(),
        source,
      };
      warn!(key, error = %err, "value could not be encoded");
      return false;
    }
  };

  match storage.set(key, &raw) {
    Ok(()) => true,
    Err(err) => {
      warn!(key, error = %err, "storage write failed");
      false
    }
  }
}

/// Removes `key`, logging (and otherwise ignoring) any failure.
pub fn safe_remove_item(storage: &dyn Storage, key: &str) {
  if let Err(err) = storage.remove(key) {
    warn!(key, error = %err, "storage remove failed");
  }
}
