//! Sharded request counter.
//!
//! A single counter record under concurrent public traffic becomes a write
//! hotspot, so each named counter is spread across N shard records. Writes
//! pick a shard at random; reads fold all shards and briefly cache the
//! total. The aggregate is eventually consistent within the cache TTL.

use crate::datastore::Datastore;
use crate::fast_cache::FastCache;
use rand::Rng;
use relay_core::{shard_key, RelayResult, AGGREGATE_CACHE_TTL_SECS};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Distributed monotonically-increasing counter keyed by name.
#[derive(Clone)]
pub struct ShardedCounter {
    store: Arc<dyn Datastore>,
    cache: Arc<dyn FastCache>,
}

impl ShardedCounter {
    pub fn new(store: Arc<dyn Datastore>, cache: Arc<dyn FastCache>) -> Self {
        Self { store, cache }
    }

    /// Increment the counter by one.
    ///
    /// A failed shard write leaves the aggregate undercounted by one; it is
    /// not retried here.
    pub async fn increment(&self, name: &str) -> RelayResult<()> {
        let config = self.store.shard_config_get_or_insert(name).await?;
        let index = rand::rng().random_range(0..config.num_shards);
        self.store.counter_shard_incr(&shard_key(name, index)).await?;
        // Cache increment is a no-op when no aggregate is cached.
        self.cache.incr(name).await;
        Ok(())
    }

    /// Cumulative count across all shards, served from the fast cache when
    /// a recent aggregate exists.
    pub async fn get(&self, name: &str) -> RelayResult<i64> {
        if let Some(total) = self.cache.get(name).await.and_then(|v| v.as_i64()) {
            return Ok(total);
        }

        let config = self.store.shard_config_get_or_insert(name).await?;
        let shards = self.store.counter_shards_get(name, config.num_shards).await?;
        let total: i64 = shards.iter().map(|s| s.count).sum();

        self.cache
            .add(
                name,
                Value::from(total),
                Duration::from_secs(AGGREGATE_CACHE_TTL_SECS),
            )
            .await;
        Ok(total)
    }

    /// Raise the shard count for a name. Never lowers it, so history spread
    /// across existing shards stays reachable.
    pub async fn increase_shards(&self, name: &str, num_shards: u32) -> RelayResult<()> {
        let mut config = self.store.shard_config_get_or_insert(name).await?;
        if config.num_shards < num_shards {
            config.num_shards = num_shards;
            self.store.shard_config_put(&config).await?;
        }
        Ok(())
    }

    /// Delete the counter: config, every shard record, and the cached
    /// aggregate.
    pub async fn delete(&self, name: &str) -> RelayResult<()> {
        let config = self.store.shard_config_get_or_insert(name).await?;
        self.store
            .counter_shards_delete(name, config.num_shards)
            .await?;
        self.cache.delete(name).await;
        self.store.shard_config_delete(name).await?;
        Ok(())
    }
}
