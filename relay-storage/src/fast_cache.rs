//! Fast cache abstraction and its in-memory implementation.
//!
//! The fast cache is advisory: losing it never breaks correctness, only
//! forces a fallback to the durable store. Operations are therefore
//! infallible at the trait boundary; implementations log and swallow
//! backend failures.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

fn composed_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}

/// Best-effort TTL key/value layer in front of the durable store.
///
/// `add` writes only when the key is absent, `replace` only when it is
/// present; both mirror the semantics the bundle cache and the shard
/// aggregates rely on. The `*_many` operations address a group of sub-keys
/// under a common prefix (one query's bundle).
#[async_trait]
pub trait FastCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);

    /// Write only if the key is absent (or expired).
    async fn add(&self, key: &str, value: Value, ttl: Duration);

    /// Write only if the key is present, keeping its remaining TTL.
    async fn replace(&self, key: &str, value: Value);

    /// Increment a cached integer aggregate. No-op when the key is absent.
    async fn incr(&self, key: &str);

    async fn delete(&self, key: &str);

    async fn get_many(&self, prefix: &str, keys: &[&str]) -> HashMap<String, Value>;
    async fn set_many(&self, prefix: &str, entries: Vec<(String, Value)>, ttl: Duration);
    async fn add_many(&self, prefix: &str, entries: Vec<(String, Value)>, ttl: Duration);
    async fn delete_many(&self, prefix: &str, keys: &[&str]);
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() >= at)
    }
}

/// In-memory TTL cache over a concurrent map with lazy expiry.
#[derive(Default)]
pub struct MemoryCache {
    slots: DashMap<String, Slot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str) -> Option<Value> {
        let expired = match self.slots.get(key) {
            Some(slot) if !slot.expired() => return Some(slot.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            // Lazy expiry: drop the stale slot on first observation.
            self.slots.remove(key);
        }
        None
    }

    fn insert(&self, key: String, value: Value, ttl: Duration) {
        self.slots.insert(
            key,
            Slot {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }
}

#[async_trait]
impl FastCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.live_value(key)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.insert(key.to_string(), value, ttl);
    }

    async fn add(&self, key: &str, value: Value, ttl: Duration) {
        if self.live_value(key).is_none() {
            self.insert(key.to_string(), value, ttl);
        }
    }

    async fn replace(&self, key: &str, value: Value) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            if !slot.expired() {
                slot.value = value;
            }
        }
    }

    async fn incr(&self, key: &str) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            if !slot.expired() {
                if let Some(current) = slot.value.as_i64() {
                    slot.value = Value::from(current + 1);
                }
            }
        }
    }

    async fn delete(&self, key: &str) {
        self.slots.remove(key);
    }

    async fn get_many(&self, prefix: &str, keys: &[&str]) -> HashMap<String, Value> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.live_value(&composed_key(prefix, key)) {
                found.insert((*key).to_string(), value);
            }
        }
        found
    }

    async fn set_many(&self, prefix: &str, entries: Vec<(String, Value)>, ttl: Duration) {
        for (key, value) in entries {
            self.insert(composed_key(prefix, &key), value, ttl);
        }
    }

    async fn add_many(&self, prefix: &str, entries: Vec<(String, Value)>, ttl: Duration) {
        for (key, value) in entries {
            let composed = composed_key(prefix, &key);
            if self.live_value(&composed).is_none() {
                self.insert(composed, value, ttl);
            }
        }
    }

    async fn delete_many(&self, prefix: &str, keys: &[&str]) {
        for key in keys {
            self.slots.remove(&composed_key(prefix, key));
        }
    }
}
