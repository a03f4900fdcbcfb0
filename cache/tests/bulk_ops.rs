mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_bulk_insert_keeps_last_entries_by_insertion_order() {
  let (cache, _) = build_test_cache(3);
  assert!(cache.add_many_event_details(&events(&["1", "2", "3", "4", "5"])));
  assert_eq!(recency(&cache), vec!["3", "4", "5"]);
}

#[test]
fn test_bulk_insert_far_over_capacity() {
  let (cache, _) = build_test_cache(200);
  let batch = numbered_events(500);
  assert!(cache.add_many_event_details(&batch));

  let snapshot = cache.details_cache();
  assert_eq!(snapshot.len(), 200);
  assert!(snapshot.is_consistent());

  let expected: Vec<String> = (300..500).map(|i| format!("e{i}")).collect();
  assert_eq!(snapshot.ids_by_recency(), expected);
  assert_eq!(cache.metrics().evicted_by_capacity, 300);
}

#[test]
fn test_bulk_eviction_is_global_across_existing_entries() {
  let (cache, _) = build_test_cache(4);
  cache.add_many_event_details(&events(&["old1", "old2", "old3"]));
  cache.get_event_details("old1");

  // old2 and old3 are now the least recent; the batch pushes them out.
  cache.add_many_event_details(&events(&["new1", "new2", "new3"]));
  assert_eq!(recency(&cache), vec!["old1", "new1", "new2", "new3"]);
}

#[test]
fn test_bulk_insert_with_duplicate_ids_keeps_last_occurrence() {
  let (cache, _) = build_test_cache(5);
  let batch = vec![
    event_with_payload("A", json!({ "action": "first" })),
    event("B"),
    event_with_payload("A", json!({ "action": "second" })),
  ];
  assert!(cache.add_many_event_details(&batch));

  let snapshot = cache.details_cache();
  assert_eq!(snapshot.ids_by_recency(), vec!["B", "A"]);
  assert_eq!(snapshot.get("A").unwrap().payload, json!({ "action": "second" }));

  let metrics = cache.metrics();
  assert_eq!(metrics.inserts, 2);
  assert_eq!(metrics.updates, 1);
}

#[test]
fn test_empty_batch_still_persists() {
  let (cache, clock) = build_test_cache(5);
  assert!(!cache.storage().contains_key(feed_cache::DETAILS_CACHE_KEY));

  clock.set(9);
  assert!(cache.add_many_event_details(&[]));
  assert!(cache.storage().contains_key(feed_cache::DETAILS_CACHE_KEY));
  assert_eq!(cache.details_cache().last_fetched(), 9);
}
