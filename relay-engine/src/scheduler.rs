//! Refresh scheduling
//!
//! A query carries two scheduling flags: `scheduled` (the owner wants
//! periodic refreshes) and `in_queue` (a task is already pending).
//! Scheduling is gated on the policy so that abandoned or error-limited
//! queries quietly fall out of the refresh loop instead of running
//! forever.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, error};

use relay_core::constants::MAX_RANDOM_COUNTDOWN_SECS;
use relay_core::error::RelayResult;
use relay_core::query::Query;

use crate::engine::Engine;

impl Engine {
    /// Arm the next refresh for a query, if the policy allows one.
    ///
    /// The countdown defaults to the refresh interval. `randomize`
    /// adds up to [`MAX_RANDOM_COUNTDOWN_SECS`] of jitter so queries
    /// sharing an interval spread out over the origin.
    ///
    /// On success `in_queue` is set and the query persisted. An
    /// enqueue failure is logged and the query left unarmed; the next
    /// public request re-attempts scheduling.
    pub async fn schedule_refresh(
        &self,
        query: &mut Query,
        randomize: bool,
        countdown: Option<u64>,
    ) -> RelayResult<()> {
        if query.in_queue || !self.policy.refreshable(query).await? {
            debug!(query_id = %query.id, in_queue = query.in_queue, "refresh not armed");
            return Ok(());
        }

        let mut delay = countdown.unwrap_or(u64::from(query.refresh_interval));
        if randomize {
            delay += rand::rng().random_range(0..=MAX_RANDOM_COUNTDOWN_SECS);
        }

        match self.queue.enqueue(query.id, Duration::from_secs(delay)).await {
            Ok(()) => {
                query.in_queue = true;
                self.queries.put(query).await?;
                debug!(query_id = %query.id, delay_secs = delay, "refresh armed");
            }
            Err(err) => {
                error!(query_id = %query.id, error = %err, "failed to enqueue refresh task");
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
