//! Query, response, and error-record entities.

use crate::identity::{new_query_id, OwnerId, QueryId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One scheduled external request.
///
/// `in_queue` is true for at most the duration of one outstanding refresh
/// task. `active == false` implies `scheduled == false`; the storage layer
/// enforces this when the public endpoint is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub owner: OwnerId,
    pub name: String,
    /// Request URL template; may contain `{today}` / `{Ndaysago}`
    /// date placeholders which are resolved at fetch time.
    pub request: String,
    /// Background refresh cadence in seconds. Range-checked at
    /// create/edit validation only.
    pub refresh_interval: u32,
    /// Public endpoint enabled.
    pub active: bool,
    /// Background refresh enabled.
    pub scheduled: bool,
    /// A refresh task is currently pending or running.
    pub in_queue: bool,
    pub modified: Timestamp,
    /// Conditional-write version; bumped by the store on every put.
    #[serde(default)]
    pub version: u64,
}

impl Query {
    /// Build a new query with defaults matching a freshly created record:
    /// inactive, unscheduled, not enqueued.
    pub fn new(owner: OwnerId, name: String, request: String, refresh_interval: u32) -> Self {
        Self {
            id: new_query_id(),
            owner,
            name,
            request,
            refresh_interval,
            active: false,
            scheduled: false,
            in_queue: false,
            modified: Utc::now(),
            version: 0,
        }
    }
}

/// The last successful origin response for a query. At most one per query,
/// overwritten in place on each success; never versioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub query_id: QueryId,
    pub content: Value,
    pub modified: Timestamp,
}

/// One failed refresh attempt. Append-only; bounded in effect by the
/// error-limit check, not by physical deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub query_id: QueryId,
    pub content: Value,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_new_query_defaults() {
        let owner = Uuid::now_v7();
        let query = Query::new(owner, "Weekly".into(), "https://origin/data".into(), 3600);
        assert!(!query.active);
        assert!(!query.scheduled);
        assert!(!query.in_queue);
        assert_eq!(query.version, 0);
        assert_eq!(query.refresh_interval, 3600);
    }
}
