//! The refresh pipeline
//!
//! A due task resolves the request's date templates, attaches the
//! owner's credential, fetches the origin, and lands the outcome:
//! success refreshes the durable response and the cached bundle,
//! failure records an error and may trip the error limit.

use tracing::{info, warn};

use relay_core::constants::MAX_RANDOM_COUNTDOWN_SECS;
use relay_core::error::RelayResult;
use relay_core::query::Query;
use relay_storage::bundle::CacheWriteMode;
use serde_json::Value;

use crate::dates::resolve_request_dates;
use crate::engine::Engine;

/// What one origin round trip produced. A decodable body carrying an
/// `error` property counts as a failure even on a 2xx status.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(Value),
    Failure(Value),
}

impl Engine {
    /// One origin round trip for a query, with dates resolved and the
    /// owner's credential attached.
    pub(crate) async fn fetch_query_response(&self, query: &Query) -> RelayResult<FetchOutcome> {
        let url = resolve_request_dates(&query.request, &self.config.timezone);
        let token = self.credentials.access_token(query.owner).await?;
        match self.fetcher.fetch(&url, token.as_deref()).await {
            Ok(content) if content.get("error").is_some() => Ok(FetchOutcome::Failure(content)),
            Ok(content) => Ok(FetchOutcome::Success(content)),
            Err(err) => Ok(FetchOutcome::Failure(err.payload())),
        }
    }

    /// Run one scheduled refresh to completion and arm the next one.
    /// Returns whether fresh content was published.
    pub async fn execute_refresh_task(&self, query: &mut Query) -> RelayResult<bool> {
        query.in_queue = false;

        match self.fetch_query_response(query).await? {
            FetchOutcome::Failure(payload) => {
                warn!(query_id = %query.id, "refresh failed");
                if self.config.log_errors {
                    self.queries.append_error(query.id, payload).await?;
                }
                if self.policy.error_limit_reached(query.id).await? {
                    warn!(query_id = %query.id, "error limit reached, refresh disabled");
                    query.scheduled = false;
                }
                self.queries.put(query).await?;
                // Short intervals retry on their normal cadence; longer
                // ones retry almost immediately with jitter so a blip
                // does not cost a whole interval of staleness.
                if u64::from(query.refresh_interval) < MAX_RANDOM_COUNTDOWN_SECS {
                    self.schedule_refresh(query, false, None).await?;
                } else {
                    self.schedule_refresh(query, true, Some(0)).await?;
                }
                Ok(false)
            }
            FetchOutcome::Success(content) => {
                self.queries.save_response(query.id, content.clone()).await?;
                if query.active {
                    self.queries
                        .bundles()
                        .set_bundle(query.id, query, content, None, CacheWriteMode::Set)
                        .await;
                    self.queries.bundles().invalidate_transformed(query.id).await;
                    self.queries.put(query).await?;
                    self.schedule_refresh(query, false, None).await?;
                    info!(query_id = %query.id, "refresh published");
                    Ok(true)
                } else {
                    // Content is stored but not served until the owner
                    // activates the query.
                    self.queries.put(query).await?;
                    Ok(false)
                }
            }
        }
    }

    /// Synchronous self-heal used by the read path when it finds an
    /// abandoned query: fetch once and refresh the durable response
    /// without touching scheduling state.
    pub(crate) async fn refresh_inline(&self, query: &Query) -> RelayResult<()> {
        match self.fetch_query_response(query).await? {
            FetchOutcome::Failure(payload) => {
                warn!(query_id = %query.id, "inline refresh failed");
                if self.config.log_errors {
                    self.queries.append_error(query.id, payload).await?;
                }
            }
            FetchOutcome::Success(content) => {
                self.queries.save_response(query.id, content).await?;
                self.queries.bundles().invalidate(query.id).await;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use relay_core::constants::QUERY_ERROR_LIMIT;
    use relay_core::format::OutputFormat;

    use crate::testing::harness;

    #[tokio::test]
    async fn test_successful_refresh_publishes_content() {
        let h = harness().with_responses(vec![Ok(json!({"rows": [[1]]}))]);
        let mut query = h.new_query(60);
        query.active = true;
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();
        // A recent reader keeps the query out of the abandoned state.
        h.touch_reader(query.id).await;

        let published = h.engine.execute_refresh_task(&mut query).await.unwrap();

        assert!(published);
        let response = h.engine.queries().response(query.id).await.unwrap().unwrap();
        assert_eq!(response.content, json!({"rows": [[1]]}));
        // Bundle was written and the next refresh armed.
        let bundle = h
            .engine
            .queries()
            .bundles()
            .get_bundle(query.id, OutputFormat::Json)
            .await;
        assert_eq!(bundle.content, Some(json!({"rows": [[1]]})));
        assert_eq!(h.queue.tasks().len(), 1);
        assert!(query.in_queue);
    }

    #[tokio::test]
    async fn test_inactive_query_stores_but_does_not_publish() {
        let h = harness().with_responses(vec![Ok(json!({"rows": []}))]);
        let mut query = h.new_query(60);
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();

        let published = h.engine.execute_refresh_task(&mut query).await.unwrap();

        assert!(!published);
        assert!(h
            .engine
            .queries()
            .response(query.id)
            .await
            .unwrap()
            .is_some());
        let bundle = h
            .engine
            .queries()
            .bundles()
            .get_bundle(query.id, OutputFormat::Json)
            .await;
        assert!(bundle.content.is_none());
    }

    #[tokio::test]
    async fn test_error_body_is_recorded_as_failure() {
        let h = harness().with_responses(vec![Ok(json!({"error": {"code": 403}}))]);
        let mut query = h.new_query(60);
        query.active = true;
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();

        let published = h.engine.execute_refresh_task(&mut query).await.unwrap();

        assert!(!published);
        assert_eq!(
            h.engine
                .queries()
                .error_count(query.id, QUERY_ERROR_LIMIT)
                .await
                .unwrap(),
            1
        );
        // Still scheduled, retry armed.
        assert!(query.scheduled);
        assert_eq!(h.queue.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_error_limit_disables_scheduling() {
        let h = harness().with_responses(vec![Ok(json!({"error": "quota"}))]);
        let mut query = h.new_query(60);
        query.active = true;
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();
        for _ in 0..QUERY_ERROR_LIMIT - 1 {
            h.engine
                .queries()
                .append_error(query.id, json!({"error": "quota"}))
                .await
                .unwrap();
        }

        h.engine.execute_refresh_task(&mut query).await.unwrap();

        assert!(!query.scheduled);
        assert!(h.queue.tasks().is_empty());
        let stored = h.engine.get_query(query.id).await.unwrap().unwrap();
        assert!(!stored.scheduled);
    }

    #[tokio::test]
    async fn test_failures_are_not_recorded_when_logging_disabled() {
        let mut h = harness().with_responses(vec![Ok(json!({"error": "quota"}))]);
        h.config.log_errors = false;
        let h = h.rebuild();
        let mut query = h.new_query(60);
        query.active = true;
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();

        h.engine.execute_refresh_task(&mut query).await.unwrap();

        assert_eq!(
            h.engine
                .queries()
                .error_count(query.id, QUERY_ERROR_LIMIT)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_short_interval_retries_on_plain_cadence() {
        let h = harness().with_responses(vec![Ok(json!({"error": "blip"}))]);
        let mut query = h.new_query(30);
        query.active = true;
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();

        h.engine.execute_refresh_task(&mut query).await.unwrap();

        let tasks = h.queue.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].1.as_secs(), 30);
    }

    #[tokio::test]
    async fn test_transport_failure_uses_error_payload() {
        let h = harness().with_transport_failure("connection refused");
        let mut query = h.new_query(60);
        query.active = true;
        query.scheduled = true;
        query.in_queue = true;
        h.engine.save_query(&mut query).await.unwrap();

        let published = h.engine.execute_refresh_task(&mut query).await.unwrap();

        assert!(!published);
        let errors = h
            .engine
            .queries()
            .error_count(query.id, QUERY_ERROR_LIMIT)
            .await
            .unwrap();
        assert_eq!(errors, 1);
    }
}
