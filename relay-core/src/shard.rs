//! Sharded counter/timestamp records.
//!
//! A logical named counter or "latest timestamp" is physically split into N
//! shard records so concurrent public reads never contend on one record.
//! A `ShardConfig` per name tracks the current shard count, which only ever
//! grows.

use crate::constants::DEFAULT_NUM_SHARDS;
use crate::identity::{QueryId, Timestamp};
use serde::{Deserialize, Serialize};

/// Tracks the number of shards for a named counter or timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    pub name: String,
    pub num_shards: u32,
}

impl ShardConfig {
    pub fn new(name: String) -> Self {
        Self {
            name,
            num_shards: DEFAULT_NUM_SHARDS,
        }
    }
}

/// One shard of a named counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterShard {
    pub key: String,
    pub count: i64,
}

/// One shard of a named timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampShard {
    pub key: String,
    pub timestamp: Timestamp,
}

/// Storage key for one shard of a named counter/timestamp.
pub fn shard_key(name: &str, index: u32) -> String {
    format!("shard-{name}-{index}")
}

/// Name of the request counter for a query.
pub fn counter_name(query_id: QueryId) -> String {
    format!("request-count-{query_id}")
}

/// Name of the last-request timestamp for a query.
pub fn timestamp_name(query_id: QueryId) -> String {
    format!("last-request-{query_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_key_layout() {
        assert_eq!(shard_key("request-count-abc", 3), "shard-request-count-abc-3");
    }

    #[test]
    fn test_names_are_distinct_per_family() {
        let id = uuid::Uuid::now_v7();
        assert_ne!(counter_name(id), timestamp_name(id));
        assert!(counter_name(id).starts_with("request-count-"));
        assert!(timestamp_name(id).starts_with("last-request-"));
    }
}
