//! Per-query response bundle cache.
//!
//! In front of the durable store sits a bundle per query id: the query
//! object itself, the default-format content, and any transformed copies a
//! caller has requested. Bundle TTL equals the query's refresh interval, so
//! cache freshness tracks schedule cadence automatically.

use crate::fast_cache::FastCache;
use relay_core::{OutputFormat, Query, QueryId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const QUERY_KEY: &str = "api_query";

/// What a bundle lookup produced. Fields are independent: a hit requires
/// both the query object and the default-format content.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub query: Option<Query>,
    pub content: Option<Value>,
    pub transformed: Option<Value>,
}

/// Write discipline for `set_bundle`.
///
/// The read path uses `Add` (never clobber what a refresh just wrote); the
/// refresh pipeline uses `Set` (the new response wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWriteMode {
    Add,
    Set,
}

/// Fast, time-bounded, best-effort cache tier for query bundles.
#[derive(Clone)]
pub struct CacheTier {
    cache: Arc<dyn FastCache>,
}

impl CacheTier {
    pub fn new(cache: Arc<dyn FastCache>) -> Self {
        Self { cache }
    }

    /// Fetch the query object, default content, and the requested format's
    /// transformed content in one cache round trip.
    pub async fn get_bundle(&self, id: QueryId, format: OutputFormat) -> Bundle {
        let prefix = id.to_string();
        let keys = [QUERY_KEY, OutputFormat::DEFAULT.as_str(), format.as_str()];
        let mut found = self.cache.get_many(&prefix, &keys).await;

        Bundle {
            query: found
                .remove(QUERY_KEY)
                .and_then(|v| serde_json::from_value(v).ok()),
            content: found.remove(OutputFormat::DEFAULT.as_str()),
            transformed: found.remove(format.as_str()),
        }
    }

    /// Store a bundle with TTL equal to the query's refresh interval.
    pub async fn set_bundle(
        &self,
        id: QueryId,
        query: &Query,
        content: Value,
        transformed: Option<(OutputFormat, Value)>,
        mode: CacheWriteMode,
    ) {
        let prefix = id.to_string();
        let ttl = Duration::from_secs(u64::from(query.refresh_interval));

        let query_value = match serde_json::to_value(query) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(query_id = %id, error = %e, "Failed to serialize query for cache");
                return;
            }
        };

        let mut entries = vec![
            (QUERY_KEY.to_string(), query_value),
            (OutputFormat::DEFAULT.as_str().to_string(), content),
        ];
        if let Some((format, value)) = transformed {
            if format != OutputFormat::DEFAULT {
                entries.push((format.as_str().to_string(), value));
            }
        }

        match mode {
            CacheWriteMode::Add => self.cache.add_many(&prefix, entries, ttl).await,
            CacheWriteMode::Set => self.cache.set_many(&prefix, entries, ttl).await,
        }
    }

    /// Remove the query object and the content for every supported format.
    pub async fn invalidate(&self, id: QueryId) {
        let prefix = id.to_string();
        let mut keys = vec![QUERY_KEY];
        keys.extend(OutputFormat::ALL.iter().map(|f| f.as_str()));
        self.cache.delete_many(&prefix, &keys).await;
    }

    /// Drop only the transformed copies; they are stale once the default
    /// content changes and will be rebuilt at the next request.
    pub async fn invalidate_transformed(&self, id: QueryId) {
        let prefix = id.to_string();
        let keys: Vec<&str> = OutputFormat::ALL
            .iter()
            .filter(|f| **f != OutputFormat::DEFAULT)
            .map(|f| f.as_str())
            .collect();
        self.cache.delete_many(&prefix, &keys).await;
    }
}
