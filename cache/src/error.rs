use std::io;

use thiserror::Error;

/// Errors raised by a [`Storage`](crate::storage::Storage) backend.
///
/// These never escape the public cache operations: the facade maps them to
/// "absent" on reads and to `false` on writes.
#[derive(Debug, Error)]
pub enum StorageError {
  /// The write would push the store past its byte quota.
  #[error("quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
  QuotaExceeded {
    key: String,
    needed: usize,
    available: usize,
  },
  /// A value could not be encoded to or decoded from JSON.
  #[error("serialization failed for '{key}': {source}")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },
  /// The underlying medium reported an I/O failure.
  #[error("storage i/o failed for '{key}': {source}")]
  Io {
    key: String,
    #[source]
    source: io::Error,
  },
  /// The store refused the operation outright.
  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

/// Errors that can occur when building an [`EventCache`](crate::EventCache).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// One of the storage keys was configured as an empty string.
  #[error("storage key for the {0} cache cannot be empty")]
  EmptyKey(&'static str),
  /// Two caches were configured to share a storage key.
  #[error("storage key '{0}' is used by more than one cache")]
  DuplicateKey(String),
  /// The schema version tag was configured as an empty string.
  #[error("schema version cannot be empty")]
  EmptyVersion,
  /// The current version equals the legacy version, so migration could
  /// never tell the two formats apart.
  #[error("schema version '{0}' collides with the legacy version")]
  VersionCollision(String),
}

/// Reasons a legacy migration stopped before removing the legacy key.
///
/// An aborted migration leaves the legacy blob in place so the next load
/// can retry it.
#[derive(Debug, Error)]
pub enum MigrationError {
  #[error("legacy cache could not be read")]
  LegacyRead(#[source] StorageError),
  #[error("index cache write failed")]
  IndexWrite,
  #[error("details cache write failed")]
  DetailsWrite,
  #[error("legacy cache key could not be removed")]
  LegacyRemove(#[source] StorageError),
}
