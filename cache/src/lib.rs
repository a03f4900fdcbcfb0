//! A two-tier, persistence-backed cache for externally fetched event records.
//!
//! Event records (activity-feed items) are cached in a size-limited
//! key/value [`Storage`] so they survive restarts. Two caches share the store:
//!
//! - The **details cache** ([`EventDetailsCache`]) holds pruned event records,
//!   bounded by a maximum entry count and evicted in least-recently-used order.
//! - The **index cache** ([`IndexCache`]) holds only ids, unbounded, so the
//!   caller can tell whether an event was ever seen after its details were
//!   evicted.
//!
//! Both are tagged with a schema version; a missing, corrupt or
//! mismatched value reads as a fresh, empty cache. A one-shot migration
//! ([`EventCache::migrate_old_cache`]) upgrades the legacy single-blob format.
//!
//! The cache is an optimization, never the source of truth: no operation
//! returns a storage error. Reads degrade to a miss and writes report
//! `false`, with the cause logged through `tracing`.
//!
//! # Example
//!
//! ```
//! use feed_cache::{EventCache, GitHubEvent, MemoryStorage};
//!
//! let cache = EventCache::builder(MemoryStorage::new())
//!   .max_size(100)
//!   .build()
//!   .unwrap();
//!
//! let event: GitHubEvent = serde_json::from_value(serde_json::json!({
//!   "id": "1",
//!   "type": "WatchEvent",
//!   "repo": { "name": "octocat/hello-world" },
//!   "payload": { "action": "started" },
//!   "created_at": "2024-05-01T12:00:00Z"
//! }))
//! .unwrap();
//!
//! assert!(cache.add_event_details(&event));
//! let details = cache.get_event_details("1").unwrap();
//! assert_eq!(details.repo, "octocat/hello-world");
//! ```

pub mod builder;
pub mod error;
pub mod event;
pub mod listener;
pub mod lru_list;
pub mod prune;
pub mod storage;
pub mod time;

mod details;
mod handle;
mod index;
mod metrics;
mod migration;

pub use builder::{CacheConfig, EventCacheBuilder, RecencyPersistence};
pub use details::EventDetailsCache;
pub use error::{BuildError, MigrationError, StorageError};
pub use event::{Actor, EventDetails, GitHubEvent, PrunedPayload, Repo};
pub use handle::EventCache;
pub use index::IndexCache;
pub use listener::{EvictionListener, EvictionReason};
pub use metrics::MetricsSnapshot;
pub use migration::MigrationOutcome;
pub use prune::{GitHubPayloadPruner, PayloadPruner};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use time::{Clock, ManualClock, SystemClock};

/// Default capacity of the details cache, in entries.
pub const DEFAULT_MAX_DETAILS: usize = 200;

/// Schema tag of the current index and details caches.
pub const DETAILS_CACHE_VERSION: &str = "5.0";

/// Schema tag of the legacy single-blob cache accepted by migration.
pub const LEGACY_CACHE_VERSION: &str = "4.0";

pub const DETAILS_CACHE_KEY: &str = "github_events_details_cache";
pub const INDEX_CACHE_KEY: &str = "github_events_index_cache";
pub const LEGACY_CACHE_KEY: &str = "github_events_cache";
