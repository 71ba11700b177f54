//! Engine assembly and the owner-facing operations
//!
//! One `Engine` holds the storage facade, the gating policy, and the
//! external collaborators. Scheduling, the refresh pipeline, and the
//! public read path are implemented in their own modules as further
//! `impl Engine` blocks.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use relay_core::error::RelayResult;
use relay_core::identity::{OwnerId, QueryId, Timestamp};
use relay_core::query::Query;
use relay_core::validate::ValidatedQueryInput;
use relay_storage::datastore::Datastore;
use relay_storage::fast_cache::FastCache;
use relay_storage::query_store::QueryStore;

use crate::config::EngineConfig;
use crate::policy::Policy;
use crate::traits::{CredentialProvider, OriginFetcher, TaskQueue};
use crate::transform::TransformRegistry;

#[derive(Clone)]
pub struct Engine {
    pub(crate) queries: QueryStore,
    pub(crate) policy: Policy,
    pub(crate) queue: Arc<dyn TaskQueue>,
    pub(crate) credentials: Arc<dyn CredentialProvider>,
    pub(crate) fetcher: Arc<dyn OriginFetcher>,
    pub(crate) transforms: TransformRegistry,
    pub(crate) config: EngineConfig,
}

/// Derived health snapshot for one query, shown on owner dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct QueryStatus {
    pub request_count: i64,
    pub last_request: Option<Timestamp>,
    pub abandoned: bool,
    pub error_limit_reached: bool,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Datastore>,
        cache: Arc<dyn FastCache>,
        queue: Arc<dyn TaskQueue>,
        credentials: Arc<dyn CredentialProvider>,
        fetcher: Arc<dyn OriginFetcher>,
        config: EngineConfig,
    ) -> Self {
        let queries = QueryStore::new(store, cache);
        let policy = Policy::new(queries.clone());
        Self {
            queries,
            policy,
            queue,
            credentials,
            fetcher,
            transforms: TransformRegistry::new(),
            config,
        }
    }

    /// Replace the default transform registry at wiring time.
    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn queries(&self) -> &QueryStore {
        &self.queries
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Construct a new inactive, unscheduled query from validated input.
    pub fn build_query(&self, owner: OwnerId, input: ValidatedQueryInput) -> Query {
        Query::new(owner, input.name, input.request, input.refresh_interval)
    }

    /// Persist edits without touching scheduling state. `Ok(None)`
    /// means the write lost a version race and the caller should
    /// re-read and retry.
    pub async fn save_query(&self, query: &mut Query) -> RelayResult<Option<Query>> {
        self.queries.put(query).await
    }

    /// Activate a query, persist it, and arm its first refresh. The
    /// first run gets a randomized near-immediate countdown so that
    /// bulk activations do not stampede the origin.
    pub async fn start_query(&self, query: &mut Query) -> RelayResult<Option<Query>> {
        query.active = true;
        query.scheduled = true;
        if self.queries.put(query).await?.is_none() {
            return Ok(None);
        }
        self.schedule_refresh(query, true, Some(0)).await?;
        info!(query_id = %query.id, name = %query.name, "query started");
        Ok(Some(query.clone()))
    }

    pub async fn get_query(&self, id: QueryId) -> RelayResult<Option<Query>> {
        self.queries.get(id).await
    }

    pub async fn list_queries(
        &self,
        owner: Option<OwnerId>,
        limit: usize,
    ) -> RelayResult<Vec<Query>> {
        self.queries.list(owner, limit).await
    }

    /// Remove the query and every record derived from it.
    pub async fn delete_query(&self, query: &Query) -> RelayResult<()> {
        self.queries.delete(query).await
    }

    /// Clear recorded refresh failures, re-opening the error limit gate.
    pub async fn delete_query_errors(&self, query: &Query) -> RelayResult<()> {
        self.queries.delete_errors(query).await
    }

    /// Toggle or force public visibility. Deactivation also stops
    /// scheduling and evicts the cached bundle.
    pub async fn set_public_status(
        &self,
        query: &mut Query,
        status: Option<bool>,
    ) -> RelayResult<bool> {
        self.queries.set_active(query, status).await
    }

    /// Toggle or force the scheduled flag. A re-enabled query is armed
    /// again by the next public request rather than immediately.
    pub async fn set_schedule_status(
        &self,
        query: &mut Query,
        status: Option<bool>,
    ) -> RelayResult<bool> {
        self.queries.set_scheduled(query, status).await
    }

    pub async fn query_status(&self, query: &Query) -> RelayResult<QueryStatus> {
        Ok(QueryStatus {
            request_count: self.policy.request_count(query.id).await?,
            last_request: self.policy.last_request(query.id).await?,
            abandoned: self.policy.abandoned(query).await?,
            error_limit_reached: self.policy.error_limit_reached(query.id).await?,
        })
    }

    /// Execute a due refresh task. Returns whether new content was
    /// cached. Unknown ids are ignored so stale queue entries for
    /// deleted queries drain harmlessly.
    pub async fn run_refresh_task(&self, id: QueryId) -> RelayResult<bool> {
        let Some(mut query) = self.queries.get(id).await? else {
            info!(query_id = %id, "refresh task for unknown query dropped");
            return Ok(false);
        };
        self.execute_refresh_task(&mut query).await
    }
}
