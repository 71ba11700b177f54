//! Refresh gating policy
//!
//! Two signals stop a query from burning origin quota forever:
//! abandonment (nobody is reading the cached content anymore) and the
//! error limit (the origin keeps failing). Both are derived from
//! per-query bookkeeping rather than stored on the query itself.

use chrono::{Duration, Utc};

use relay_core::constants::{ABANDONED_INTERVAL_MULTIPLE, QUERY_ERROR_LIMIT};
use relay_core::error::RelayResult;
use relay_core::identity::{QueryId, Timestamp};
use relay_core::query::Query;
use relay_core::shard::{counter_name, timestamp_name};
use relay_storage::query_store::QueryStore;

/// Read-side view over the per-query bookkeeping shards and error
/// records.
#[derive(Clone)]
pub struct Policy {
    queries: QueryStore,
}

impl Policy {
    pub fn new(queries: QueryStore) -> Self {
        Self { queries }
    }

    /// When the cached content was last served, if it ever was.
    pub async fn last_request(&self, id: QueryId) -> RelayResult<Option<Timestamp>> {
        self.queries
            .request_timestamp()
            .get(&timestamp_name(id))
            .await
    }

    /// How many times the cached content has been served.
    pub async fn request_count(&self, id: QueryId) -> RelayResult<i64> {
        self.queries.request_counter().get(&counter_name(id)).await
    }

    /// Whether consecutive refresh failures have reached the limit.
    pub async fn error_limit_reached(&self, id: QueryId) -> RelayResult<bool> {
        let count = self.queries.error_count(id, QUERY_ERROR_LIMIT).await?;
        Ok(count == QUERY_ERROR_LIMIT)
    }

    /// Whether the query's audience has gone away.
    ///
    /// A query that has produced a response but has never been read is
    /// abandoned outright. Otherwise the age of the last request (or,
    /// for queries never requested, the last modification) is compared
    /// against a multiple of the refresh interval.
    pub async fn abandoned(&self, query: &Query) -> RelayResult<bool> {
        let last_request = self.last_request(query.id).await?;
        let request_count = self.request_count(query.id).await?;

        if last_request.is_none()
            && request_count == 0
            && self.queries.response(query.id).await?.is_some()
        {
            return Ok(true);
        }

        let max_idle = Duration::seconds(
            ABANDONED_INTERVAL_MULTIPLE * i64::from(query.refresh_interval),
        );
        match last_request {
            Some(last) => Ok(Utc::now() - last > max_idle),
            None => Ok(Utc::now() - query.modified > max_idle),
        }
    }

    /// Whether a refresh may be scheduled at all.
    pub async fn refreshable(&self, query: &Query) -> RelayResult<bool> {
        Ok(query.scheduled
            && !self.abandoned(query).await?
            && !self.error_limit_reached(query.id).await?)
    }
}

/// Human-readable age of a timestamp, e.g. "2 days, 3 hours, 10 minutes".
pub fn format_timedelta(delta: Duration) -> String {
    let total_minutes = delta.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} day{}", plural(days)));
    }
    if hours > 0 {
        parts.push(format!("{hours} hour{}", plural(hours)));
    }
    parts.push(format!("{minutes} minute{}", plural(minutes)));
    parts.join(", ")
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use relay_core::identity::new_owner_id;
    use relay_storage::datastore::MemoryDatastore;
    use relay_storage::fast_cache::MemoryCache;

    fn policy() -> Policy {
        let store = Arc::new(MemoryDatastore::new());
        let cache = Arc::new(MemoryCache::new());
        Policy::new(QueryStore::new(store, cache))
    }

    fn query(interval: u32) -> Query {
        Query::new(
            new_owner_id(),
            "report".to_string(),
            "https://api.example.com/data".to_string(),
            interval,
        )
    }

    #[tokio::test]
    async fn test_fresh_query_is_not_abandoned() {
        let policy = policy();
        let query = query(60);
        assert!(!policy.abandoned(&query).await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_request_is_not_abandoned() {
        let policy = policy();
        let query = query(60);
        policy
            .queries
            .request_timestamp()
            .refresh(&timestamp_name(query.id))
            .await
            .unwrap();
        assert!(!policy.abandoned(&query).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_modified_time_is_abandoned() {
        let policy = policy();
        let mut query = query(60);
        query.modified = Utc::now() - Duration::seconds(121);
        assert!(policy.abandoned(&query).await.unwrap());
    }

    #[tokio::test]
    async fn test_response_never_read_is_abandoned() {
        let policy = policy();
        let query = query(60);
        policy
            .queries
            .save_response(query.id, json!({"rows": []}))
            .await
            .unwrap();
        // Just created, but content exists and nobody has asked for it.
        assert!(policy.abandoned(&query).await.unwrap());
    }

    #[tokio::test]
    async fn test_response_with_readers_uses_request_age() {
        let policy = policy();
        let query = query(60);
        policy
            .queries
            .save_response(query.id, json!({"rows": []}))
            .await
            .unwrap();
        policy
            .queries
            .request_timestamp()
            .refresh(&timestamp_name(query.id))
            .await
            .unwrap();
        assert!(!policy.abandoned(&query).await.unwrap());
    }

    #[tokio::test]
    async fn test_error_limit() {
        let policy = policy();
        let query = query(60);
        assert!(!policy.error_limit_reached(query.id).await.unwrap());
        for _ in 0..QUERY_ERROR_LIMIT {
            policy
                .queries
                .append_error(query.id, json!({"error": "boom"}))
                .await
                .unwrap();
        }
        assert!(policy.error_limit_reached(query.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_refreshable_requires_scheduled() {
        let policy = policy();
        let mut query = query(60);
        assert!(!policy.refreshable(&query).await.unwrap());
        query.scheduled = true;
        assert!(policy.refreshable(&query).await.unwrap());
    }

    #[test]
    fn test_format_timedelta() {
        assert_eq!(format_timedelta(Duration::seconds(30)), "0 minutes");
        assert_eq!(format_timedelta(Duration::minutes(1)), "1 minute");
        assert_eq!(
            format_timedelta(Duration::minutes(24 * 60 + 61)),
            "1 day, 1 hour, 1 minute"
        );
        assert_eq!(
            format_timedelta(Duration::minutes(2 * 24 * 60 + 125)),
            "2 days, 2 hours, 5 minutes"
        );
    }
}
