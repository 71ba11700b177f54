//! Router-level tests driving the full HTTP surface against in-memory
//! storage and scripted collaborators.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use relay_api::{create_router, AppState};
use relay_core::constants::{ERROR_INACTIVE_QUERY, ERROR_INVALID_QUERY_ID};
use relay_engine::testing::{RecordingQueue, ScriptedFetcher, StaticCredentials};
use relay_engine::{Engine, EngineConfig};
use relay_storage::datastore::MemoryDatastore;
use relay_storage::fast_cache::MemoryCache;

fn app_with_responses(responses: Vec<Result<Value, relay_core::error::OriginError>>) -> Router {
    let engine = Engine::new(
        Arc::new(MemoryDatastore::new()),
        Arc::new(MemoryCache::new()),
        Arc::new(RecordingQueue::new()),
        Arc::new(StaticCredentials(None)),
        Arc::new(ScriptedFetcher::new(responses)),
        EngineConfig::default(),
    );
    create_router(AppState::new(engine))
}

fn app() -> Router {
    app_with_responses(Vec::new())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_ping() {
    let (status, body) = send(&app(), get("/health/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_query_validates_input() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json(
            "/api/queries",
            &json!({"name": "x", "request": "https://api.example.com/d", "refresh_interval": 14}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_create_and_fetch_query() {
    let app = app();
    let (status, created) = send(
        &app,
        post_json(
            "/api/queries",
            &json!({
                "name": "weekly traffic",
                "request": "https://api.example.com/data",
                "refresh_interval": 60,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["active"], false);

    let (status, detail) = send(&app, get(&format!("/api/queries/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["query"]["name"], "weekly traffic");
    assert_eq!(detail["status"]["request_count"], 0);
}

#[tokio::test]
async fn test_unknown_query_is_404() {
    let (status, body) = send(
        &app(),
        get("/api/queries/00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "QUERY_NOT_FOUND");
}

#[tokio::test]
async fn test_public_endpoint_rejects_malformed_id() {
    let (status, body) = send(&app(), get("/query?id=not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], ERROR_INVALID_QUERY_ID);
}

#[tokio::test]
async fn test_started_query_serves_after_refresh_task() {
    let app = app_with_responses(vec![Ok(json!({"rows": [[9]]}))]);

    let (status, created) = send(
        &app,
        post_json(
            "/api/queries",
            &json!({
                "name": "weekly traffic",
                "request": "https://api.example.com/data",
                "refresh_interval": 60,
                "start": true,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["active"], true);
    let id = created["id"].as_str().unwrap().to_string();

    // No refresh has run yet: the public endpoint reports the query as
    // not yet available.
    let (status, body) = send(&app, get(&format!("/query?id={id}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], ERROR_INACTIVE_QUERY);

    // The task-queue callback runs the due refresh.
    let (status, run) = send(
        &app,
        post_json("/api/tasks/refresh", &json!({"query_id": id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["published"], true);

    let (status, body) = send(&app, get(&format!("/query?id={id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"rows": [[9]]}));
}

#[tokio::test]
async fn test_clear_errors_endpoint() {
    let app = app_with_responses(vec![Ok(json!({"error": "quota"}))]);
    let (_, created) = send(
        &app,
        post_json(
            "/api/queries",
            &json!({
                "name": "weekly traffic",
                "request": "https://api.example.com/data",
                "refresh_interval": 60,
                "start": true,
            }),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (_, run) = send(
        &app,
        post_json("/api/tasks/refresh", &json!({"query_id": id})),
    )
    .await;
    assert_eq!(run["published"], false);

    let (status, errors) = send(&app, get(&format!("/api/queries/{id}/errors"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(errors.as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/queries/{id}/errors"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, errors) = send(&app, get(&format!("/api/queries/{id}/errors"))).await;
    assert!(errors.as_array().unwrap().is_empty());
}
