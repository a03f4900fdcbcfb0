mod common;

use std::sync::Arc;

use common::*;
use feed_cache::{
  MemoryStorage, MigrationError, MigrationOutcome, DETAILS_CACHE_KEY, INDEX_CACHE_KEY,
  LEGACY_CACHE_KEY,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn seed_legacy(storage: &MemoryStorage, value: serde_json::Value) {
  storage.insert_raw(LEGACY_CACHE_KEY, &value.to_string());
}

fn legacy_blob(version: serde_json::Value, count: usize) -> serde_json::Value {
  json!({ "version": version, "events": numbered_events(count) })
}

#[test]
fn test_migrates_all_ids_to_index_and_first_n_to_details() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, legacy_blob(json!("4.0"), 10));
  let cache = build_cache_over(storage.clone(), 5);

  let outcome = cache.migrate_old_cache();
  assert!(outcome.is_migrated(), "unexpected outcome: {outcome:?}");
  assert!(matches!(outcome, MigrationOutcome::Migrated { indexed: 10, detailed: 5 }));

  let index = cache.index_cache();
  let all: Vec<String> = (0..10).map(|i| format!("e{i}")).collect();
  assert_eq!(index.ids(), all.as_slice());
  assert_eq!(index.total_count(), 10);

  let details = cache.details_cache();
  let mut cached: Vec<String> = details.events().keys().cloned().collect();
  cached.sort();
  assert_eq!(cached, vec!["e0", "e1", "e2", "e3", "e4"]);
  assert_eq!(details.ids_by_recency(), vec!["e0", "e1", "e2", "e3", "e4"]);

  assert!(!storage.contains_key(LEGACY_CACHE_KEY));
  assert!(cache.has_seen("e9"));
  assert!(cache.get_event_details("e9").is_none());
}

#[test]
fn test_stated_total_count_is_kept() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(
    &storage,
    json!({ "version": "4.0", "events": numbered_events(3), "totalCount": 250 }),
  );
  let cache = build_cache_over(storage, 5);

  assert!(cache.migrate_old_cache().is_migrated());
  assert_eq!(cache.index_cache().total_count(), 250);
}

#[test]
fn test_wrong_version_leaves_everything_untouched() {
  let storage = Arc::new(MemoryStorage::new());
  let blob = legacy_blob(json!("3.0"), 4);
  seed_legacy(&storage, blob.clone());
  let cache = build_cache_over(storage.clone(), 5);

  let outcome = cache.migrate_old_cache();
  assert!(matches!(
    outcome,
    MigrationOutcome::UnsupportedVersion(Some(ref found)) if found == "3.0"
  ));

  assert!(!storage.contains_key(INDEX_CACHE_KEY));
  assert!(!storage.contains_key(DETAILS_CACHE_KEY));
  assert_eq!(storage.raw(LEGACY_CACHE_KEY), Some(blob.to_string()));
}

#[test]
fn test_missing_version_is_unsupported() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, json!({ "events": numbered_events(2) }));
  let cache = build_cache_over(storage.clone(), 5);

  assert!(matches!(cache.migrate_old_cache(), MigrationOutcome::UnsupportedVersion(None)));
  assert!(storage.contains_key(LEGACY_CACHE_KEY));
}

#[test]
fn test_numeric_version_tag_is_accepted() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, legacy_blob(json!(4.0), 2));
  let cache = build_cache_over(storage, 5);

  assert!(cache.migrate_old_cache().is_migrated());
  assert_eq!(recency(&cache), vec!["e0", "e1"]);
}

#[test]
fn test_integer_version_tag_is_accepted() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, legacy_blob(json!(4), 1));
  let cache = build_cache_over(storage, 5);

  assert!(cache.migrate_old_cache().is_migrated());
}

#[test]
fn test_absent_legacy_is_a_no_op() {
  let (cache, _) = build_test_cache(5);
  assert!(matches!(cache.migrate_old_cache(), MigrationOutcome::NoLegacyCache));
  assert!(cache.storage().is_empty());
}

#[test]
fn test_second_run_is_a_no_op() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, legacy_blob(json!("4.0"), 3));
  let cache = build_cache_over(storage.clone(), 5);

  assert!(cache.migrate_old_cache().is_migrated());
  let writes = storage.write_count();
  assert!(matches!(cache.migrate_old_cache(), MigrationOutcome::NoLegacyCache));
  assert_eq!(storage.write_count(), writes);
}

#[test]
fn test_corrupt_legacy_blob_is_ignored() {
  let storage = Arc::new(MemoryStorage::new());
  storage.insert_raw(LEGACY_CACHE_KEY, "[[[");
  let cache = build_cache_over(storage.clone(), 5);

  assert!(matches!(cache.migrate_old_cache(), MigrationOutcome::NoLegacyCache));
  assert!(!storage.contains_key(INDEX_CACHE_KEY));
}

#[test]
fn test_undecodable_events_are_indexed_but_not_detailed() {
  let storage = Arc::new(MemoryStorage::new());
  let mut blob = legacy_blob(json!("4.0"), 2);
  blob["events"]
    .as_array_mut()
    .unwrap()
    .insert(1, json!({ "id": "partial", "type": "PushEvent" }));
  seed_legacy(&storage, blob);
  let cache = build_cache_over(storage, 5);

  assert!(matches!(
    cache.migrate_old_cache(),
    MigrationOutcome::Migrated { indexed: 3, detailed: 2 }
  ));
  let index = cache.index_cache();
  assert_eq!(index.ids(), &["e0", "partial", "e1"]);
  assert_eq!(index.total_count(), 3);
  assert!(cache.has_seen("partial"));
  assert_eq!(recency(&cache), vec!["e0", "e1"]);
}

#[test]
fn test_entries_without_an_id_count_toward_total_only() {
  let storage = Arc::new(MemoryStorage::new());
  let mut blob = legacy_blob(json!("4.0"), 1);
  blob["events"].as_array_mut().unwrap().push(json!({ "not": "an event" }));
  seed_legacy(&storage, blob);
  let cache = build_cache_over(storage, 5);

  assert!(matches!(
    cache.migrate_old_cache(),
    MigrationOutcome::Migrated { indexed: 1, detailed: 1 }
  ));
  assert_eq!(cache.index_cache().total_count(), 2);
}

#[test]
fn test_null_event_list_migrates_as_empty() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, json!({ "version": "4.0", "events": null }));
  let cache = build_cache_over(storage.clone(), 5);

  assert!(matches!(
    cache.migrate_old_cache(),
    MigrationOutcome::Migrated { indexed: 0, detailed: 0 }
  ));
  assert!(!storage.contains_key(LEGACY_CACHE_KEY));
  assert!(cache.index_cache().is_empty());
  assert_eq!(cache.index_cache().total_count(), 0);
}

#[test]
fn test_write_failure_aborts_and_keeps_legacy_for_retry() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, legacy_blob(json!("4.0"), 6));
  let cache = build_cache_over(storage.clone(), 5);

  storage.set_fail_writes(true);
  let outcome = cache.migrate_old_cache();
  assert!(matches!(outcome, MigrationOutcome::Aborted(MigrationError::IndexWrite)));
  assert!(storage.contains_key(LEGACY_CACHE_KEY));

  storage.set_fail_writes(false);
  assert!(cache.migrate_old_cache().is_migrated());
  assert!(!storage.contains_key(LEGACY_CACHE_KEY));
}

#[test]
fn test_details_write_failure_aborts_and_keeps_legacy() {
  let heavy: Vec<_> = numbered_events(8)
    .into_iter()
    .map(|mut e| {
      e.payload = json!({ "action": "x".repeat(200) });
      e
    })
    .collect();
  let legacy = json!({ "version": "4.0", "events": heavy }).to_string();

  // Room for the legacy blob and the small index, not for the details.
  let storage = Arc::new(MemoryStorage::with_quota(LEGACY_CACHE_KEY.len() + legacy.len() + 300));
  storage.insert_raw(LEGACY_CACHE_KEY, &legacy);
  let cache = build_cache_over(storage.clone(), 8);

  let outcome = cache.migrate_old_cache();
  assert!(
    matches!(outcome, MigrationOutcome::Aborted(MigrationError::DetailsWrite)),
    "unexpected outcome: {outcome:?}"
  );
  assert!(storage.contains_key(LEGACY_CACHE_KEY));
  assert!(cache.details_cache().is_empty());
}

#[test]
fn test_legacy_read_failure_aborts() {
  let storage = Arc::new(MemoryStorage::new());
  seed_legacy(&storage, legacy_blob(json!("4.0"), 2));
  storage.set_fail_reads(true);
  let cache = build_cache_over(storage.clone(), 5);

  assert!(matches!(
    cache.migrate_old_cache(),
    MigrationOutcome::Aborted(MigrationError::LegacyRead(_))
  ));
  storage.set_fail_reads(false);
  assert!(storage.contains_key(LEGACY_CACHE_KEY));
}

#[test]
fn test_migration_evicts_existing_details_by_global_order() {
  let storage = Arc::new(MemoryStorage::new());
  let cache = build_cache_over(storage.clone(), 3);
  cache.add_many_event_details(&events(&["x", "y"]));

  seed_legacy(&storage, legacy_blob(json!("4.0"), 10));
  assert!(cache.migrate_old_cache().is_migrated());
  assert_eq!(recency(&cache), vec!["e0", "e1", "e2"]);
}
