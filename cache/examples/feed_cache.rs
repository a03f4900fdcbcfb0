use std::sync::Arc;

use feed_cache::{EventCache, EventDetails, EvictionReason, FileStorage, GitHubEvent, MigrationOutcome};
use serde_json::json;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feed_cache=debug")),
    )
    .init();

  let dir = std::env::temp_dir().join("feed_cache_demo");
  let storage = FileStorage::open(&dir).expect("Failed to open storage directory");
  println!("Storing caches under {}", dir.display());

  let evictions = Arc::new(std::sync::atomic::AtomicUsize::new(0));
  let counter = evictions.clone();

  let cache = EventCache::builder(storage)
    .max_size(3)
    .eviction_listener(move |id: &str, _: &EventDetails, reason: EvictionReason| {
      counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
      println!("  evicted {id}: {reason}");
    })
    .build()
    .expect("Failed to build cache");

  // Upgrade any cache left behind by an older release.
  match cache.migrate_old_cache() {
    MigrationOutcome::Migrated { indexed, detailed } => {
      println!("Migrated legacy cache: {indexed} ids indexed, {detailed} details kept")
    }
    other => println!("Migration: {other:?}"),
  }

  let events: Vec<GitHubEvent> = (1..=5)
    .map(|i| {
      serde_json::from_value(json!({
        "id": format!("{i}"),
        "type": "WatchEvent",
        "repo": { "name": format!("octocat/repo-{i}") },
        "payload": { "action": "started" },
        "created_at": "2024-05-01T12:00:00Z"
      }))
      .expect("valid event")
    })
    .collect();

  println!("\nRecording {} events in the index, caching their details.", events.len());
  cache.update_index_cache(&events, events.len() as u64);
  cache.add_many_event_details(&events);

  for id in ["1", "4"] {
    match cache.get_event_details(id) {
      Some(details) => println!("Found {id}: {} on {}", details.kind, details.repo),
      None => println!("{id} not cached, seen before: {}", cache.has_seen(id)),
    }
  }

  println!("\nDetails by recency: {:?}", cache.details_cache().ids_by_recency());
  println!("Evictions observed: {}", evictions.load(std::sync::atomic::Ordering::Relaxed));
  println!("\nCache metrics: {:#?}", cache.metrics());

  cache.clear_all_caches();
}
