//! Collaborator seams for the engine
//!
//! The engine never talks to the network or a real task queue directly.
//! It goes through these traits so the API layer can wire in HTTP and
//! tokio-backed implementations while tests substitute scripted doubles.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use relay_core::error::{OriginError, RelayResult};
use relay_core::identity::{OwnerId, QueryId};

/// Enqueue failure. Scheduling treats this as advisory: the refresh is
/// skipped and the query record is left untouched so a later request or
/// admin action can re-arm it.
#[derive(Debug, Clone, Error)]
#[error("failed to enqueue refresh task: {reason}")]
pub struct TaskQueueError {
    pub reason: String,
}

impl TaskQueueError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Deferred-execution queue for refresh tasks.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Arrange for the query to be refreshed after `countdown` elapses.
    async fn enqueue(&self, query_id: QueryId, countdown: Duration) -> Result<(), TaskQueueError>;
}

/// Resolves a bearer token for an owner, refreshing it if expired.
/// Returns `Ok(None)` when the owner has no usable credential; the
/// fetch then goes out unauthenticated.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self, owner_id: OwnerId) -> RelayResult<Option<String>>;
}

/// Performs the actual HTTP GET against the origin API and decodes the
/// body as JSON. Error bodies the origin returns as JSON come back as
/// `Ok`; the pipeline classifies them by inspecting the payload.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        access_token: Option<&str>,
    ) -> Result<serde_json::Value, OriginError>;
}
