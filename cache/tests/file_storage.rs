mod common;

use common::*;
use feed_cache::{EventCache, FileStorage, MigrationOutcome, Storage, LEGACY_CACHE_KEY};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_cache_survives_reopening_the_directory() {
  let dir = tempfile::tempdir().unwrap();

  {
    let cache = EventCache::builder(FileStorage::open(dir.path()).unwrap())
      .max_size(3)
      .build()
      .unwrap();
    assert!(cache.add_many_event_details(&events(&["A", "B", "C", "D"])));
    assert!(cache.get_event_details("B").is_some());
  }

  let cache = EventCache::builder(FileStorage::open(dir.path()).unwrap())
    .max_size(3)
    .build()
    .unwrap();
  assert_eq!(recency(&cache), vec!["C", "D", "B"]);

  cache.clear_all_caches();
  cache.clear_all_caches();
  assert!(cache.details_cache().is_empty());
}

#[test]
fn test_migration_over_files() {
  let dir = tempfile::tempdir().unwrap();
  let storage = FileStorage::open(dir.path()).unwrap();
  storage
    .set(
      LEGACY_CACHE_KEY,
      &json!({ "version": "4.0", "events": numbered_events(4) }).to_string(),
    )
    .unwrap();

  let cache = EventCache::builder(storage).max_size(2).build().unwrap();
  assert!(matches!(
    cache.migrate_old_cache(),
    MigrationOutcome::Migrated { indexed: 4, detailed: 2 }
  ));
  assert_eq!(cache.storage().get(LEGACY_CACHE_KEY).unwrap(), None);
  assert_eq!(recency(&cache), vec!["e0", "e1"]);
}
