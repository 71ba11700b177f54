//! The public read path
//!
//! Anonymous callers hit this with a query id and an optional output
//! format. Content comes from the bundle cache when possible, else the
//! durable store; the read lazily repopulates the cache, keeps the
//! request bookkeeping fresh, and opportunistically re-arms the
//! background refresh.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use relay_core::constants::{default_error_content, error_content, ERROR_INACTIVE_QUERY,
    ERROR_INVALID_QUERY_ID};
use relay_core::error::{ProxyError, RelayResult};
use relay_core::format::OutputFormat;
use relay_core::query::Query;
use relay_core::shard::{counter_name, timestamp_name};
use relay_storage::bundle::CacheWriteMode;

use crate::anonymize::remove_private_keys;
use crate::engine::Engine;

impl Engine {
    /// Serve one public request. Returns the rendered content and HTTP
    /// status on success; unservable queries surface as
    /// [`ProxyError`]s carrying the payload and status to render.
    pub async fn serve_public_request(
        &self,
        id_param: &str,
        format: OutputFormat,
    ) -> RelayResult<(Value, u16)> {
        let Ok(id) = Uuid::parse_str(id_param) else {
            return Err(ProxyError::new(error_content(ERROR_INVALID_QUERY_ID), 400).into());
        };

        let bundle = self.queries.bundles().get_bundle(id, format).await;
        if let (Some(query), Some(content)) = (bundle.query, bundle.content) {
            return self
                .serve_content(query, content, bundle.transformed, format, false)
                .await;
        }

        let Some(query) = self.queries.get(id).await? else {
            return Err(ProxyError::new(default_error_content(), 400).into());
        };

        // Self-healing read: an abandoned query gets one synchronous
        // refresh so its first visitor in a long time sees current data.
        if query.active
            && !self.policy.error_limit_reached(query.id).await?
            && self.policy.abandoned(&query).await?
        {
            self.refresh_inline(&query).await?;
        }
        let schedule_query = !query.in_queue;

        if !query.active {
            return Err(ProxyError::new(default_error_content(), 400).into());
        }
        let Some(response) = self.queries.response(id).await? else {
            return Err(ProxyError::new(error_content(ERROR_INACTIVE_QUERY), 400).into());
        };

        self.serve_content(query, response.content, None, format, schedule_query)
            .await
    }

    /// Bookkeeping, anonymization, format transform, cache write-back,
    /// and opportunistic scheduling for a servable response.
    async fn serve_content(
        &self,
        query: Query,
        mut content: Value,
        transformed: Option<Value>,
        format: OutputFormat,
        schedule_query: bool,
    ) -> RelayResult<(Value, u16)> {
        let id = query.id;

        // Best effort: a failed shard write costs one count, not the
        // request.
        if let Err(err) = self.queries.request_counter().increment(&counter_name(id)).await {
            warn!(query_id = %id, error = %err, "request count increment failed");
        }
        if let Err(err) = self
            .queries
            .request_timestamp()
            .refresh(&timestamp_name(id))
            .await
        {
            warn!(query_id = %id, error = %err, "request timestamp refresh failed");
        }

        if self.config.anonymize_responses {
            content = remove_private_keys(content);
        }

        let transformed = match transformed {
            Some(value) => value,
            None => match self.transforms.get(format).transform(&content) {
                Ok(value) => value,
                Err(err) => {
                    warn!(query_id = %id, format = format.as_str(), error = %err,
                        "transform failed, serving untransformed content");
                    content.clone()
                }
            },
        };

        // Add, not set: never clobber a bundle a refresh just wrote.
        self.queries
            .bundles()
            .set_bundle(
                id,
                &query,
                content.clone(),
                Some((format, transformed.clone())),
                CacheWriteMode::Add,
            )
            .await;

        if schedule_query {
            let mut query = query;
            self.schedule_refresh(&mut query, false, None).await?;
        }

        Ok((transformed, 200))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use relay_core::constants::{ERROR_INACTIVE_QUERY, ERROR_INVALID_QUERY_ID,
        ERROR_INVALID_REQUEST};
    use relay_core::error::RelayError;
    use relay_core::format::OutputFormat;
    use relay_core::query::Query;
    use relay_storage::bundle::CacheWriteMode;

    use crate::testing::{harness, TestHarness};
    use crate::transform::{Transform, TransformError, TransformRegistry};

    fn expect_proxy_error(result: Result<(Value, u16), RelayError>) -> (Value, u16) {
        match result {
            Err(RelayError::Proxy(err)) => (err.content, err.status),
            other => panic!("expected proxy error, got {other:?}"),
        }
    }

    async fn served_query(h: &TestHarness, content: Value) -> Query {
        let mut query = h.new_query(60);
        query.active = true;
        query.scheduled = true;
        h.engine.save_query(&mut query).await.unwrap();
        h.engine
            .queries()
            .save_response(query.id, content)
            .await
            .unwrap();
        query
    }

    #[tokio::test]
    async fn test_malformed_id_is_rejected() {
        let h = harness();
        let (content, status) = expect_proxy_error(
            h.engine
                .serve_public_request("not-a-uuid", OutputFormat::Json)
                .await,
        );
        assert_eq!(status, 400);
        assert_eq!(content["error"], ERROR_INVALID_QUERY_ID);
    }

    #[tokio::test]
    async fn test_unknown_id_is_invalid_request() {
        let h = harness();
        let id = relay_core::identity::new_query_id();
        let (content, status) = expect_proxy_error(
            h.engine
                .serve_public_request(&id.to_string(), OutputFormat::Json)
                .await,
        );
        assert_eq!(status, 400);
        assert_eq!(content["error"], ERROR_INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_inactive_query_is_invalid_request() {
        let h = harness();
        let mut query = h.new_query(60);
        h.engine.save_query(&mut query).await.unwrap();
        let (content, status) = expect_proxy_error(
            h.engine
                .serve_public_request(&query.id.to_string(), OutputFormat::Json)
                .await,
        );
        assert_eq!(status, 400);
        assert_eq!(content["error"], ERROR_INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_active_query_without_response_is_inactive_query() {
        let h = harness();
        let mut query = h.new_query(60);
        query.active = true;
        h.engine.save_query(&mut query).await.unwrap();
        let (content, status) = expect_proxy_error(
            h.engine
                .serve_public_request(&query.id.to_string(), OutputFormat::Json)
                .await,
        );
        assert_eq!(status, 400);
        assert_eq!(content["error"], ERROR_INACTIVE_QUERY);
    }

    #[tokio::test]
    async fn test_serves_stored_response_and_records_the_read() {
        let h = harness();
        let query = served_query(&h, json!({"rows": [[7]]})).await;
        h.touch_reader(query.id).await;

        let (content, status) = h
            .engine
            .serve_public_request(&query.id.to_string(), OutputFormat::Json)
            .await
            .unwrap();

        assert_eq!(status, 200);
        assert_eq!(content, json!({"rows": [[7]]}));
        assert!(h.engine.policy().request_count(query.id).await.unwrap() >= 1);
        assert!(h
            .engine
            .policy()
            .last_request(query.id)
            .await
            .unwrap()
            .is_some());
        // Opportunistic scheduling armed the refresh.
        assert_eq!(h.queue.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_the_durable_store() {
        let h = harness();
        // Bundle exists only in the fast cache; the datastore is empty.
        let query = h.new_query(60);
        h.engine
            .queries()
            .bundles()
            .set_bundle(
                query.id,
                &query,
                json!({"rows": [[1]]}),
                None,
                CacheWriteMode::Set,
            )
            .await;

        let (content, status) = h
            .engine
            .serve_public_request(&query.id.to_string(), OutputFormat::Json)
            .await
            .unwrap();

        assert_eq!(status, 200);
        assert_eq!(content, json!({"rows": [[1]]}));
        assert!(h.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_anonymization_strips_private_keys() {
        let mut h = harness();
        h.config.anonymize_responses = true;
        let h = h.rebuild();
        let query = served_query(
            &h,
            json!({"id": "account-7", "selfLink": "https://x", "rows": []}),
        )
        .await;
        h.touch_reader(query.id).await;

        let (content, _) = h
            .engine
            .serve_public_request(&query.id.to_string(), OutputFormat::Json)
            .await
            .unwrap();

        assert_eq!(content, json!({"rows": []}));
    }

    #[tokio::test]
    async fn test_failed_transform_falls_back_to_default_content() {
        struct Broken;
        impl Transform for Broken {
            fn transform(&self, _: &Value) -> Result<Value, TransformError> {
                Err(TransformError::new("unrenderable"))
            }
        }

        let h = harness();
        let mut transforms = TransformRegistry::new();
        transforms.register(OutputFormat::Csv, Arc::new(Broken));
        let engine = h.engine.clone().with_transforms(transforms);
        let query = served_query(&h, json!({"rows": [[2]]})).await;
        h.touch_reader(query.id).await;

        let (content, status) = engine
            .serve_public_request(&query.id.to_string(), OutputFormat::Csv)
            .await
            .unwrap();

        assert_eq!(status, 200);
        assert_eq!(content, json!({"rows": [[2]]}));
    }

    #[tokio::test]
    async fn test_abandoned_query_self_heals_inline() {
        let h = harness().with_responses(vec![Ok(json!({"rows": ["fresh"]}))]);
        let mut query = h.new_query(60);
        query.active = true;
        h.engine.save_query(&mut query).await.unwrap();
        h.engine
            .queries()
            .save_response(query.id, json!({"rows": ["stale"]}))
            .await
            .unwrap();
        // Stored but never read: abandoned, so the read refreshes first.
        let (content, status) = h
            .engine
            .serve_public_request(&query.id.to_string(), OutputFormat::Json)
            .await
            .unwrap();

        assert_eq!(status, 200);
        assert_eq!(content, json!({"rows": ["fresh"]}));
        assert_eq!(h.fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_error_limited_query_is_not_self_healed() {
        let h = harness().with_responses(vec![Ok(json!({"rows": ["fresh"]}))]);
        let mut query = h.new_query(60);
        query.active = true;
        query.modified = Utc::now() - Duration::seconds(300);
        h.engine.save_query(&mut query).await.unwrap();
        h.engine
            .queries()
            .save_response(query.id, json!({"rows": ["stale"]}))
            .await
            .unwrap();
        h.fill_error_limit(query.id).await;

        let (content, _) = h
            .engine
            .serve_public_request(&query.id.to_string(), OutputFormat::Json)
            .await
            .unwrap();

        // Served the stored body untouched; no origin call was made.
        assert_eq!(content, json!({"rows": ["stale"]}));
        assert!(h.fetcher.calls().is_empty());
    }
}
