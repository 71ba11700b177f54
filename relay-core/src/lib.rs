//! Relay Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types, limits, and validation - no I/O.

pub mod constants;
pub mod error;
pub mod format;
pub mod identity;
pub mod owner;
pub mod query;
pub mod shard;
pub mod validate;

pub use constants::{
    default_error_content, error_content, ABANDONED_INTERVAL_MULTIPLE, AGGREGATE_CACHE_TTL_SECS,
    DEFAULT_NUM_SHARDS, ERROR_INACTIVE_QUERY, ERROR_INVALID_QUERY_ID, ERROR_INVALID_REQUEST,
    FETCH_DEADLINE_SECS, MAX_INTERVAL, MAX_NAME_LENGTH, MAX_RANDOM_COUNTDOWN_SECS, MAX_URL_LENGTH,
    MIN_INTERVAL, QUERY_ERROR_LIMIT,
};
pub use error::{
    ConfigError, OriginError, ProxyError, RecordType, RelayError, RelayResult, StorageError,
    ValidationError,
};
pub use format::OutputFormat;
pub use identity::{new_owner_id, new_query_id, OwnerId, QueryId, Timestamp};
pub use owner::Owner;
pub use query::{CachedResponse, ErrorRecord, Query};
pub use shard::{
    counter_name, shard_key, timestamp_name, CounterShard, ShardConfig, TimestampShard,
};
pub use validate::{validate_query_input, ValidatedQueryInput};
