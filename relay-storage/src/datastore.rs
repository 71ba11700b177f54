//! Durable store abstraction and its in-memory implementation.
//!
//! Every mutation is a single-record operation; the only coordination the
//! engine relies on is the conditional write for `Query` (optimistic
//! version check) and the atomic create-or-update of one shard record.

use async_trait::async_trait;
use relay_core::{
    shard_key, CachedResponse, CounterShard, ErrorRecord, Owner, OwnerId, Query, QueryId,
    RelayResult, ShardConfig, StorageError, Timestamp, TimestampShard,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// Durable record store consumed by the engine.
///
/// `query_put` is a conditional single-record write: it succeeds only when
/// the stored version matches the incoming one, and returns `Ok(None)` when
/// a concurrent writer won the race. Callers treat that as "save failed",
/// never as something to retry automatically.
#[async_trait]
pub trait Datastore: Send + Sync {
    // === Query records ===

    async fn query_get(&self, id: QueryId) -> RelayResult<Option<Query>>;

    /// Conditional write. Returns the stored query (version bumped) or
    /// `None` on a version conflict.
    async fn query_put(&self, query: &Query) -> RelayResult<Option<Query>>;

    async fn query_delete(&self, id: QueryId) -> RelayResult<()>;

    /// List queries ordered by name. `owner = None` lists all queries
    /// (admin capability).
    async fn query_list(&self, owner: Option<OwnerId>, limit: usize) -> RelayResult<Vec<Query>>;

    // === Cached responses (1:1 with a query) ===

    async fn response_get(&self, query_id: QueryId) -> RelayResult<Option<CachedResponse>>;
    async fn response_put(&self, response: &CachedResponse) -> RelayResult<()>;
    async fn response_delete(&self, query_id: QueryId) -> RelayResult<()>;

    // === Error records (1:N with a query, append-only) ===

    async fn error_append(&self, record: &ErrorRecord) -> RelayResult<()>;

    /// Count error records up to `limit`. Bounded so the check never scans
    /// an unbounded history for pathological queries.
    async fn error_count(&self, query_id: QueryId, limit: usize) -> RelayResult<usize>;

    async fn error_list(&self, query_id: QueryId) -> RelayResult<Vec<ErrorRecord>>;
    async fn error_delete_all(&self, query_id: QueryId) -> RelayResult<()>;

    // === Shard configs ===

    async fn shard_config_get_or_insert(&self, name: &str) -> RelayResult<ShardConfig>;
    async fn shard_config_put(&self, config: &ShardConfig) -> RelayResult<()>;
    async fn shard_config_delete(&self, name: &str) -> RelayResult<()>;

    // === Counter shards ===

    /// Atomically create-or-increment one counter shard record.
    async fn counter_shard_incr(&self, key: &str) -> RelayResult<()>;

    async fn counter_shards_get(
        &self,
        name: &str,
        num_shards: u32,
    ) -> RelayResult<Vec<CounterShard>>;

    async fn counter_shards_delete(&self, name: &str, num_shards: u32) -> RelayResult<()>;

    // === Timestamp shards ===

    /// Atomically create-or-replace one timestamp shard record with `now`.
    async fn timestamp_shard_touch(&self, key: &str, now: Timestamp) -> RelayResult<()>;

    async fn timestamp_shards_get(
        &self,
        name: &str,
        num_shards: u32,
    ) -> RelayResult<Vec<TimestampShard>>;

    async fn timestamp_shards_delete(&self, name: &str, num_shards: u32) -> RelayResult<()>;

    // === Owner records ===

    async fn owner_get(&self, id: OwnerId) -> RelayResult<Option<Owner>>;
    async fn owner_put(&self, owner: &Owner) -> RelayResult<()>;
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

#[derive(Default)]
struct Inner {
    queries: HashMap<QueryId, Query>,
    responses: HashMap<QueryId, CachedResponse>,
    errors: HashMap<QueryId, Vec<ErrorRecord>>,
    shard_configs: HashMap<String, ShardConfig>,
    counter_shards: HashMap<String, CounterShard>,
    timestamp_shards: HashMap<String, TimestampShard>,
    owners: HashMap<OwnerId, Owner>,
}

/// In-memory datastore used by tests and the default binary.
#[derive(Default)]
pub struct MemoryDatastore {
    inner: RwLock<Inner>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner.write().map_err(|_| StorageError::LockPoisoned)
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn query_get(&self, id: QueryId) -> RelayResult<Option<Query>> {
        Ok(self.read()?.queries.get(&id).cloned())
    }

    async fn query_put(&self, query: &Query) -> RelayResult<Option<Query>> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.queries.get(&query.id) {
            if existing.version != query.version {
                return Ok(None);
            }
        }
        let mut stored = query.clone();
        stored.version += 1;
        inner.queries.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn query_delete(&self, id: QueryId) -> RelayResult<()> {
        self.write()?.queries.remove(&id);
        Ok(())
    }

    async fn query_list(&self, owner: Option<OwnerId>, limit: usize) -> RelayResult<Vec<Query>> {
        let inner = self.read()?;
        let mut queries: Vec<Query> = inner
            .queries
            .values()
            .filter(|q| owner.map_or(true, |o| q.owner == o))
            .cloned()
            .collect();
        queries.sort_by(|a, b| a.name.cmp(&b.name));
        queries.truncate(limit);
        Ok(queries)
    }

    async fn response_get(&self, query_id: QueryId) -> RelayResult<Option<CachedResponse>> {
        Ok(self.read()?.responses.get(&query_id).cloned())
    }

    async fn response_put(&self, response: &CachedResponse) -> RelayResult<()> {
        self.write()?
            .responses
            .insert(response.query_id, response.clone());
        Ok(())
    }

    async fn response_delete(&self, query_id: QueryId) -> RelayResult<()> {
        self.write()?.responses.remove(&query_id);
        Ok(())
    }

    async fn error_append(&self, record: &ErrorRecord) -> RelayResult<()> {
        self.write()?
            .errors
            .entry(record.query_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn error_count(&self, query_id: QueryId, limit: usize) -> RelayResult<usize> {
        let inner = self.read()?;
        let count = inner.errors.get(&query_id).map_or(0, Vec::len);
        Ok(count.min(limit))
    }

    async fn error_list(&self, query_id: QueryId) -> RelayResult<Vec<ErrorRecord>> {
        Ok(self.read()?.errors.get(&query_id).cloned().unwrap_or_default())
    }

    async fn error_delete_all(&self, query_id: QueryId) -> RelayResult<()> {
        self.write()?.errors.remove(&query_id);
        Ok(())
    }

    async fn shard_config_get_or_insert(&self, name: &str) -> RelayResult<ShardConfig> {
        let mut inner = self.write()?;
        let config = inner
            .shard_configs
            .entry(name.to_string())
            .or_insert_with(|| ShardConfig::new(name.to_string()));
        Ok(config.clone())
    }

    async fn shard_config_put(&self, config: &ShardConfig) -> RelayResult<()> {
        self.write()?
            .shard_configs
            .insert(config.name.clone(), config.clone());
        Ok(())
    }

    async fn shard_config_delete(&self, name: &str) -> RelayResult<()> {
        self.write()?.shard_configs.remove(name);
        Ok(())
    }

    async fn counter_shard_incr(&self, key: &str) -> RelayResult<()> {
        let mut inner = self.write()?;
        let shard = inner
            .counter_shards
            .entry(key.to_string())
            .or_insert_with(|| CounterShard {
                key: key.to_string(),
                count: 0,
            });
        shard.count += 1;
        Ok(())
    }

    async fn counter_shards_get(
        &self,
        name: &str,
        num_shards: u32,
    ) -> RelayResult<Vec<CounterShard>> {
        let inner = self.read()?;
        Ok((0..num_shards)
            .filter_map(|index| inner.counter_shards.get(&shard_key(name, index)).cloned())
            .collect())
    }

    async fn counter_shards_delete(&self, name: &str, num_shards: u32) -> RelayResult<()> {
        let mut inner = self.write()?;
        for index in 0..num_shards {
            inner.counter_shards.remove(&shard_key(name, index));
        }
        Ok(())
    }

    async fn timestamp_shard_touch(&self, key: &str, now: Timestamp) -> RelayResult<()> {
        self.write()?.timestamp_shards.insert(
            key.to_string(),
            TimestampShard {
                key: key.to_string(),
                timestamp: now,
            },
        );
        Ok(())
    }

    async fn timestamp_shards_get(
        &self,
        name: &str,
        num_shards: u32,
    ) -> RelayResult<Vec<TimestampShard>> {
        let inner = self.read()?;
        Ok((0..num_shards)
            .filter_map(|index| inner.timestamp_shards.get(&shard_key(name, index)).cloned())
            .collect())
    }

    async fn timestamp_shards_delete(&self, name: &str, num_shards: u32) -> RelayResult<()> {
        let mut inner = self.write()?;
        for index in 0..num_shards {
            inner.timestamp_shards.remove(&shard_key(name, index));
        }
        Ok(())
    }

    async fn owner_get(&self, id: OwnerId) -> RelayResult<Option<Owner>> {
        Ok(self.read()?.owners.get(&id).cloned())
    }

    async fn owner_put(&self, owner: &Owner) -> RelayResult<()> {
        self.write()?.owners.insert(owner.id, owner.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_core::new_owner_id;

    fn sample_query(name: &str) -> Query {
        Query::new(new_owner_id(), name.into(), "https://origin/data".into(), 60)
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let store = MemoryDatastore::new();
        let query = sample_query("Sessions");

        let saved = store.query_put(&query).await.unwrap().unwrap();
        assert_eq!(saved.version, 1);

        let loaded = store.query_get(query.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Sessions");
        assert_eq!(loaded.request, query.request);
        assert_eq!(loaded.refresh_interval, 60);
    }

    #[tokio::test]
    async fn test_conditional_write_rejects_stale_version() {
        let store = MemoryDatastore::new();
        let query = sample_query("Sessions");

        let first = store.query_put(&query).await.unwrap().unwrap();

        // A writer still holding the original version loses the race.
        assert!(store.query_put(&query).await.unwrap().is_none());

        // The winner can keep writing.
        assert!(store.query_put(&first).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_query_list_orders_by_name_and_filters_owner() {
        let store = MemoryDatastore::new();
        let owner = new_owner_id();

        for name in ["bravo", "alpha", "charlie"] {
            let mut query = sample_query(name);
            query.owner = owner;
            store.query_put(&query).await.unwrap();
        }
        store.query_put(&sample_query("other-owner")).await.unwrap();

        let mine = store.query_list(Some(owner), 100).await.unwrap();
        let names: Vec<&str> = mine.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);

        let all = store.query_list(None, 100).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_error_count_is_bounded() {
        let store = MemoryDatastore::new();
        let query = sample_query("Sessions");
        for _ in 0..25 {
            let record = ErrorRecord {
                query_id: query.id,
                content: serde_json::json!({"error": "boom"}),
                timestamp: Utc::now(),
            };
            store.error_append(&record).await.unwrap();
        }
        assert_eq!(store.error_count(query.id, 10).await.unwrap(), 10);
        assert_eq!(store.error_count(query.id, 30).await.unwrap(), 25);
    }
}
