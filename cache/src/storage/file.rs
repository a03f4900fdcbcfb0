use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::Storage;
use crate::error::StorageError;

/// A [`Storage`] that keeps one file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value readable.
#[derive(Debug, Clone)]
pub struct FileStorage {
  root: PathBuf,
}

impl FileStorage {
  /// Opens (creating if needed) a store rooted at `root`.
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
    let root = root.into();
    fs::create_dir_all(&root).map_err(|source| StorageError::Io {
      key: root.display().to_string(),
      source,
    })?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
    if key.is_empty() {
      return Err(StorageError::Unavailable("empty storage key".to_string()));
    }
    Ok(self.root.join(format!("{}.json", escape_key(key))))
  }
}

// Keeps file names portable: anything outside [A-Za-z0-9_.-] becomes %XX.
fn escape_key(key: &str) -> String {
  let mut out = String::with_capacity(key.len());
  for byte in key.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' => out.push(byte as char),
      _ => out.push_str(&format!("%{byte:02X}")),
    }
  }
  out
}

fn io_err(key: &str, source: io::Error) -> StorageError {
  StorageError::Io {
    key: key.to_string(),
    source,
  }
}

// The temporary file is left behind on error; the caller removes it.
fn write_and_rename(tmp: &Path, path: &Path, value: &str) -> io::Result<()> {
  let mut file = fs::File::create(tmp)?;
  file.write_all(value.as_bytes())?;
  file.sync_all()?;
  drop(file);
  fs::rename(tmp, path)
}

impl Storage for FileStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let path = self.path_for(key)?;
    match fs::read_to_string(&path) {
      Ok(raw) => Ok(Some(raw)),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(err) => Err(io_err(key, err)),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let path = self.path_for(key)?;
    let tmp = path.with_extension("json.tmp");

    write_and_rename(&tmp, &path, value).map_err(|e| {
      let _ = fs::remove_file(&tmp);
      io_err(key, e)
    })
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let path = self.path_for(key)?;
    match fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(err) => Err(io_err(key, err)),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn escapes_unsafe_characters() {
    assert_eq!(escape_key("github_events-cache.v5"), "github_events-cache.v5");
    assert_eq!(escape_key("a/b c"), "a%2Fb%20c");
  }

  #[test]
  fn round_trips_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path().join("store")).unwrap();

    assert_eq!(storage.get("k").unwrap(), None);
    storage.set("k", "{\"a\":1}").unwrap();
    assert_eq!(storage.get("k").unwrap().as_deref(), Some("{\"a\":1}"));

    // Another handle on the same directory sees the value.
    let reopened = FileStorage::open(storage.root()).unwrap();
    assert_eq!(reopened.get("k").unwrap().as_deref(), Some("{\"a\":1}"));

    storage.remove("k").unwrap();
    storage.remove("k").unwrap();
    assert_eq!(reopened.get("k").unwrap(), None);
  }

  #[test]
  fn failed_set_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();

    // A directory where the value file should go makes the final step fail.
    let target = dir.path().join("k.json");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), "x").unwrap();

    assert!(matches!(storage.set("k", "{}"), Err(StorageError::Io { .. })));
    assert!(!dir.path().join("k.json.tmp").exists());
    assert!(target.is_dir());
  }

  #[test]
  fn empty_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    assert!(matches!(storage.set("", "x"), Err(StorageError::Unavailable(_))));
  }
}
