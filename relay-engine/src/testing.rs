//! Test doubles and a wiring harness for engine tests
//!
//! Collaborators here record what the engine asked of them instead of
//! touching the network or a real task queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use relay_core::constants::QUERY_ERROR_LIMIT;
use relay_core::error::{OriginError, RelayResult};
use relay_core::identity::{new_owner_id, OwnerId, QueryId};
use relay_core::query::Query;
use relay_core::shard::timestamp_name;
use relay_storage::datastore::MemoryDatastore;
use relay_storage::fast_cache::MemoryCache;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::traits::{CredentialProvider, OriginFetcher, TaskQueue, TaskQueueError};

/// Records every enqueue instead of executing anything.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<(QueryId, Duration)>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<(QueryId, Duration)> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, query_id: QueryId, countdown: Duration) -> Result<(), TaskQueueError> {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push((query_id, countdown));
        }
        Ok(())
    }
}

/// Rejects every enqueue.
pub struct FailingQueue;

#[async_trait]
impl TaskQueue for FailingQueue {
    async fn enqueue(&self, _: QueryId, _: Duration) -> Result<(), TaskQueueError> {
        Err(TaskQueueError::new("queue unavailable"))
    }
}

/// Hands out a fixed token (or none) for every owner.
pub struct StaticCredentials(pub Option<String>);

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self, _: OwnerId) -> RelayResult<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Replays a scripted sequence of fetch results and records each call.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<Value, OriginError>>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<Value, OriginError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The (url, access_token) pairs fetched so far.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl OriginFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        access_token: Option<&str>,
    ) -> Result<Value, OriginError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((url.to_string(), access_token.map(str::to_string)));
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| {
                Err(OriginError::Fetch {
                    reason: "no scripted response".to_string(),
                })
            })
    }
}

/// Fully wired in-memory engine plus handles on its collaborators.
pub struct TestHarness {
    pub store: Arc<MemoryDatastore>,
    pub cache: Arc<MemoryCache>,
    pub queue: Arc<RecordingQueue>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub config: EngineConfig,
    pub engine: Engine,
}

/// Default harness: empty stores, a recording queue, no scripted
/// responses, no credential, UTC dates.
pub fn harness() -> TestHarness {
    TestHarness::build(
        Arc::new(MemoryDatastore::new()),
        Arc::new(MemoryCache::new()),
        Arc::new(RecordingQueue::new()),
        Arc::new(ScriptedFetcher::default()),
        EngineConfig::default(),
    )
}

impl TestHarness {
    fn build(
        store: Arc<MemoryDatastore>,
        cache: Arc<MemoryCache>,
        queue: Arc<RecordingQueue>,
        fetcher: Arc<ScriptedFetcher>,
        config: EngineConfig,
    ) -> Self {
        let engine = Engine::new(
            store.clone(),
            cache.clone(),
            queue.clone(),
            Arc::new(StaticCredentials(None)),
            fetcher.clone(),
            config.clone(),
        );
        Self {
            store,
            cache,
            queue,
            fetcher,
            config,
            engine,
        }
    }

    /// Rebuild the engine from the harness's current fields, keeping
    /// all stored data.
    pub fn rebuild(self) -> Self {
        Self::build(self.store, self.cache, self.queue, self.fetcher, self.config)
    }

    /// Swap in a different task queue implementation.
    pub fn with_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.engine = Engine::new(
            self.store.clone(),
            self.cache.clone(),
            queue,
            Arc::new(StaticCredentials(None)),
            self.fetcher.clone(),
            self.config.clone(),
        );
        self
    }

    /// Script the next fetch results.
    pub fn with_responses(mut self, responses: Vec<Result<Value, OriginError>>) -> Self {
        self.fetcher = Arc::new(ScriptedFetcher::new(responses));
        Self::build(
            self.store,
            self.cache,
            self.queue,
            self.fetcher,
            self.config,
        )
    }

    /// Script a single transport-level fetch failure.
    pub fn with_transport_failure(self, reason: &str) -> Self {
        self.with_responses(vec![Err(OriginError::Fetch {
            reason: reason.to_string(),
        })])
    }

    /// A query belonging to a fresh owner, inactive and unscheduled.
    pub fn new_query(&self, refresh_interval: u32) -> Query {
        Query::new(
            new_owner_id(),
            "traffic report".to_string(),
            "https://api.example.com/data?metrics=visits".to_string(),
            refresh_interval,
        )
    }

    /// Record enough failures to trip the error limit.
    pub async fn fill_error_limit(&self, id: QueryId) {
        for _ in 0..QUERY_ERROR_LIMIT {
            self.engine
                .queries()
                .append_error(id, json!({"error": "scripted failure"}))
                .await
                .expect("append error");
        }
    }

    /// Simulate a recent public read so the query is not abandoned.
    pub async fn touch_reader(&self, id: QueryId) {
        self.engine
            .queries()
            .request_timestamp()
            .refresh(&timestamp_name(id))
            .await
            .expect("touch request timestamp");
    }
}
