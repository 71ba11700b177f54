//! Relay Storage - Storage Traits and In-Memory Implementation
//!
//! Defines the durable-store and fast-cache abstractions the refresh engine
//! runs against, plus the components layered on them: sharded
//! counters/timestamps, the query store, and the response bundle cache.
//! The in-memory implementations back tests and the default binary; a SQL
//! or memcached deployment implements the same traits.

pub mod bundle;
pub mod counter;
pub mod datastore;
pub mod fast_cache;
pub mod query_store;
pub mod timestamp;

pub use bundle::{Bundle, CacheTier, CacheWriteMode};
pub use counter::ShardedCounter;
pub use datastore::{Datastore, MemoryDatastore};
pub use fast_cache::{FastCache, MemoryCache};
pub use query_store::QueryStore;
pub use timestamp::ShardedTimestamp;
