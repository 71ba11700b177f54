//! Sharded "most recent event time" tracker.
//!
//! Same contention-avoidance technique as the sharded counter: a touch
//! lands on one random shard, a read folds all shards with max and caches
//! the result briefly.

use crate::datastore::Datastore;
use crate::fast_cache::FastCache;
use chrono::Utc;
use rand::Rng;
use relay_core::{shard_key, RelayResult, Timestamp, AGGREGATE_CACHE_TTL_SECS};
use std::sync::Arc;
use std::time::Duration;

/// Distributed latest-timestamp tracker keyed by name.
#[derive(Clone)]
pub struct ShardedTimestamp {
    store: Arc<dyn Datastore>,
    cache: Arc<dyn FastCache>,
}

impl ShardedTimestamp {
    pub fn new(store: Arc<dyn Datastore>, cache: Arc<dyn FastCache>) -> Self {
        Self { store, cache }
    }

    /// Touch the named timestamp to now.
    pub async fn refresh(&self, name: &str) -> RelayResult<()> {
        let now = Utc::now();
        let config = self.store.shard_config_get_or_insert(name).await?;
        let index = rand::rng().random_range(0..config.num_shards);
        self.store
            .timestamp_shard_touch(&shard_key(name, index), now)
            .await?;
        // Replace is a no-op when no aggregate is cached.
        self.cache
            .replace(name, serde_json::to_value(now).unwrap_or_default())
            .await;
        Ok(())
    }

    /// Most recent touch across all shards, or `None` if the name was
    /// never touched.
    pub async fn get(&self, name: &str) -> RelayResult<Option<Timestamp>> {
        if let Some(cached) = self.cache.get(name).await {
            if let Ok(ts) = serde_json::from_value::<Timestamp>(cached) {
                return Ok(Some(ts));
            }
        }

        let config = self.store.shard_config_get_or_insert(name).await?;
        let shards = self
            .store
            .timestamp_shards_get(name, config.num_shards)
            .await?;
        let latest = shards.iter().map(|s| s.timestamp).max();

        if let Some(latest) = latest {
            self.cache
                .add(
                    name,
                    serde_json::to_value(latest).unwrap_or_default(),
                    Duration::from_secs(AGGREGATE_CACHE_TTL_SECS),
                )
                .await;
        }
        Ok(latest)
    }

    /// Raise the shard count for a name; never lowers it.
    pub async fn increase_shards(&self, name: &str, num_shards: u32) -> RelayResult<()> {
        let mut config = self.store.shard_config_get_or_insert(name).await?;
        if config.num_shards < num_shards {
            config.num_shards = num_shards;
            self.store.shard_config_put(&config).await?;
        }
        Ok(())
    }

    /// Delete the timestamp: config, shards, cached aggregate.
    pub async fn delete(&self, name: &str) -> RelayResult<()> {
        let config = self.store.shard_config_get_or_insert(name).await?;
        self.store
            .timestamp_shards_delete(name, config.num_shards)
            .await?;
        self.cache.delete(name).await;
        self.store.shard_config_delete(name).await?;
        Ok(())
    }
}
