//! Durable record of each scheduled query and its related records.
//!
//! Wraps the raw [`Datastore`] with the domain discipline the engine needs:
//! saves stamp the modified time, conflicts surface as `None`, and deleting
//! a query cascades to its response, error history, counter/timestamp
//! shards, and cached bundle.

use crate::bundle::CacheTier;
use crate::counter::ShardedCounter;
use crate::datastore::Datastore;
use crate::fast_cache::FastCache;
use crate::timestamp::ShardedTimestamp;
use chrono::Utc;
use relay_core::{
    counter_name, timestamp_name, CachedResponse, ErrorRecord, Owner, OwnerId, Query, QueryId,
    RelayResult,
};
use serde_json::Value;
use std::sync::Arc;

/// Query persistence facade over the durable store and the fast cache.
#[derive(Clone)]
pub struct QueryStore {
    store: Arc<dyn Datastore>,
    counter: ShardedCounter,
    timestamp: ShardedTimestamp,
    bundles: CacheTier,
}

impl QueryStore {
    pub fn new(store: Arc<dyn Datastore>, cache: Arc<dyn FastCache>) -> Self {
        Self {
            counter: ShardedCounter::new(store.clone(), cache.clone()),
            timestamp: ShardedTimestamp::new(store.clone(), cache.clone()),
            bundles: CacheTier::new(cache),
            store,
        }
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.store
    }

    pub async fn get(&self, id: QueryId) -> RelayResult<Option<Query>> {
        self.store.query_get(id).await
    }

    /// Save a query, stamping its modified time. Returns `None` when a
    /// concurrent write won; the caller treats that as "save failed" and
    /// does not retry.
    ///
    /// On success the caller's copy is updated in place (modified time and
    /// bumped version) so follow-up saves in the same flow don't conflict
    /// with themselves.
    pub async fn put(&self, query: &mut Query) -> RelayResult<Option<Query>> {
        query.modified = Utc::now();
        match self.store.query_put(query).await? {
            Some(saved) => {
                query.version = saved.version;
                Ok(Some(saved))
            }
            None => {
                tracing::debug!(query_id = %query.id, "Query save lost a conditional write");
                Ok(None)
            }
        }
    }

    /// List queries ordered by name. `owner = None` is the admin listing.
    pub async fn list(&self, owner: Option<OwnerId>, limit: usize) -> RelayResult<Vec<Query>> {
        self.store.query_list(owner, limit).await
    }

    /// Delete a query and everything hanging off it: stored response, error
    /// records, both shard families, and the cached bundle.
    pub async fn delete(&self, query: &Query) -> RelayResult<()> {
        let id = query.id;
        self.store.error_delete_all(id).await?;
        self.store.response_delete(id).await?;
        self.store.query_delete(id).await?;
        self.bundles.invalidate(id).await;
        self.counter.delete(&counter_name(id)).await?;
        self.timestamp.delete(&timestamp_name(id)).await?;
        tracing::info!(query_id = %id, "Deleted query and related records");
        Ok(())
    }

    // === Stored response ===

    pub async fn response(&self, id: QueryId) -> RelayResult<Option<CachedResponse>> {
        self.store.response_get(id).await
    }

    /// Update or create the stored response for a query. Overwritten in
    /// place; never versioned.
    pub async fn save_response(&self, id: QueryId, content: Value) -> RelayResult<()> {
        let modified = Utc::now();
        let response = match self.store.response_get(id).await? {
            Some(mut existing) => {
                existing.content = content;
                existing.modified = modified;
                existing
            }
            None => CachedResponse {
                query_id: id,
                content,
                modified,
            },
        };
        self.store.response_put(&response).await
    }

    // === Error records ===

    pub async fn append_error(&self, id: QueryId, content: Value) -> RelayResult<()> {
        let record = ErrorRecord {
            query_id: id,
            content,
            timestamp: Utc::now(),
        };
        self.store.error_append(&record).await
    }

    pub async fn error_count(&self, id: QueryId, limit: usize) -> RelayResult<usize> {
        self.store.error_count(id, limit).await
    }

    pub async fn delete_errors(&self, query: &Query) -> RelayResult<()> {
        self.store.error_delete_all(query.id).await
    }

    // === Status changes ===

    /// Change the public endpoint status. `None` toggles. Disabling public
    /// access also stops scheduling. Returns false when the save lost a
    /// conditional write.
    pub async fn set_active(&self, query: &mut Query, status: Option<bool>) -> RelayResult<bool> {
        query.active = match status {
            Some(status) => status,
            None => !query.active,
        };
        if !query.active {
            query.scheduled = false;
        }

        if self.put(query).await?.is_none() {
            return Ok(false);
        }
        self.bundles.invalidate(query.id).await;
        Ok(true)
    }

    /// Change the background scheduling status. `None` toggles.
    pub async fn set_scheduled(
        &self,
        query: &mut Query,
        status: Option<bool>,
    ) -> RelayResult<bool> {
        query.scheduled = match status {
            Some(status) => status,
            None => !query.scheduled,
        };
        Ok(self.put(query).await?.is_some())
    }

    // === Component accessors for the engine ===

    pub fn request_counter(&self) -> &ShardedCounter {
        &self.counter
    }

    pub fn request_timestamp(&self) -> &ShardedTimestamp {
        &self.timestamp
    }

    pub fn bundles(&self) -> &CacheTier {
        &self.bundles
    }
}
