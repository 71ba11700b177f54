//! Application limits and public error payloads.

use serde_json::{json, Value};

/// Maximum length for a query display name, in characters.
pub const MAX_NAME_LENGTH: usize = 115;

/// Maximum length for a query request URL, in characters.
pub const MAX_URL_LENGTH: usize = 2000;

/// Minimum refresh interval, in seconds (inclusive).
pub const MIN_INTERVAL: u32 = 15;

/// Maximum refresh interval, in seconds (exclusive).
pub const MAX_INTERVAL: u32 = 2_505_600;

/// Scheduling: number of recorded errors at which scheduling is paused.
pub const QUERY_ERROR_LIMIT: usize = 10;

/// Scheduling: a query is abandoned when there have been no requests for
/// this multiple of its refresh interval.
pub const ABANDONED_INTERVAL_MULTIPLE: i64 = 2;

/// Scheduling: upper bound of the random jitter added to task countdowns so
/// that queries sharing an interval do not all fire at once.
pub const MAX_RANDOM_COUNTDOWN_SECS: u64 = 60;

/// Default shard count for new counter/timestamp names.
pub const DEFAULT_NUM_SHARDS: u32 = 20;

/// How long a folded counter/timestamp aggregate stays in the fast cache.
pub const AGGREGATE_CACHE_TTL_SECS: u64 = 60;

/// Deadline for one origin fetch.
pub const FETCH_DEADLINE_SECS: u64 = 60;

// Public error codes.
pub const ERROR_INACTIVE_QUERY: &str = "inactiveQuery";
pub const ERROR_INVALID_REQUEST: &str = "invalidRequest";
pub const ERROR_INVALID_QUERY_ID: &str = "invalidQueryId";

fn error_message(code: &str) -> &'static str {
    match code {
        ERROR_INACTIVE_QUERY => "The query is not yet available. Wait and try again later.",
        ERROR_INVALID_QUERY_ID => "Invalid query id.",
        _ => "The query id is invalid or the query is disabled.",
    }
}

/// Build the small structured payload served for a public-facing error.
pub fn error_content(code: &str) -> Value {
    json!({
        "error": code,
        "code": 400,
        "message": error_message(code),
    })
}

/// The generic "invalid request" payload.
pub fn default_error_content() -> Value {
    error_content(ERROR_INVALID_REQUEST)
}
