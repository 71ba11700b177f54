//! Owner management API
//!
//! CRUD over queries plus the scheduling controls: start, toggle
//! public/schedule status, clear errors, and the refresh-task hook.

use axum::extract::{Path, Query as QueryParams, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use relay_core::identity::{new_owner_id, OwnerId};
use relay_core::query::{ErrorRecord, Query};
use relay_core::validate::validate_query_input;
use relay_engine::engine::QueryStatus;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: usize = 100;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateQueryRequest {
    pub owner_id: Option<OwnerId>,
    pub name: String,
    pub request: String,
    pub refresh_interval: i64,
    /// Activate and schedule immediately instead of saving as a draft.
    #[serde(default)]
    pub start: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQueryRequest {
    pub name: Option<String>,
    pub request: Option<String>,
    pub refresh_interval: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub owner_id: Option<OwnerId>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Explicit target state; absent means toggle.
    pub status: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RunTaskRequest {
    pub query_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct QueryDetail {
    pub query: Query,
    pub status: QueryStatus,
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn create_query(
    State(state): State<AppState>,
    Json(body): Json<CreateQueryRequest>,
) -> ApiResult<(StatusCode, Json<Query>)> {
    let input = validate_query_input(&body.name, &body.request, body.refresh_interval)
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let owner = body.owner_id.unwrap_or_else(new_owner_id);
    let mut query = state.engine.build_query(owner, input);

    let saved = if body.start {
        state.engine.start_query(&mut query).await?
    } else {
        state.engine.save_query(&mut query).await?
    };
    match saved {
        Some(stored) => Ok((StatusCode::CREATED, Json(stored))),
        None => Err(ApiError::conflict()),
    }
}

pub async fn list_queries(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> ApiResult<Json<Vec<Query>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let queries = state.engine.list_queries(params.owner_id, limit).await?;
    Ok(Json(queries))
}

pub async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QueryDetail>> {
    let query = load_query(&state, id).await?;
    let status = state.engine.query_status(&query).await?;
    Ok(Json(QueryDetail { query, status }))
}

pub async fn update_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateQueryRequest>,
) -> ApiResult<Json<Query>> {
    let mut query = load_query(&state, id).await?;

    let name = body.name.unwrap_or_else(|| query.name.clone());
    let request = body.request.unwrap_or_else(|| query.request.clone());
    let refresh_interval = body
        .refresh_interval
        .unwrap_or(i64::from(query.refresh_interval));
    let input = validate_query_input(&name, &request, refresh_interval)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    query.name = input.name;
    query.request = input.request;
    query.refresh_interval = input.refresh_interval;

    match state.engine.save_query(&mut query).await? {
        Some(stored) => Ok(Json(stored)),
        None => Err(ApiError::conflict()),
    }
}

pub async fn delete_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let query = load_query(&state, id).await?;
    state.engine.delete_query(&query).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activate and schedule an existing query.
pub async fn start_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Query>> {
    let mut query = load_query(&state, id).await?;
    match state.engine.start_query(&mut query).await? {
        Some(_) => Ok(Json(query)),
        None => Err(ApiError::conflict()),
    }
}

pub async fn set_public_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Json<Query>> {
    let mut query = load_query(&state, id).await?;
    if !state.engine.set_public_status(&mut query, body.status).await? {
        return Err(ApiError::conflict());
    }
    Ok(Json(query))
}

pub async fn set_schedule_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Json<Query>> {
    let mut query = load_query(&state, id).await?;
    if !state
        .engine
        .set_schedule_status(&mut query, body.status)
        .await?
    {
        return Err(ApiError::conflict());
    }
    Ok(Json(query))
}

pub async fn list_errors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ErrorRecord>>> {
    // Surface the raw error history so owners can see why the breaker
    // tripped.
    load_query(&state, id).await?;
    let errors = state.engine.queries().datastore().error_list(id).await?;
    Ok(Json(errors))
}

pub async fn delete_errors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let query = load_query(&state, id).await?;
    state.engine.delete_query_errors(&query).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Task-queue callback: run one due refresh now.
pub async fn run_refresh_task(
    State(state): State<AppState>,
    Json(body): Json<RunTaskRequest>,
) -> ApiResult<Json<Value>> {
    let published = state.engine.run_refresh_task(body.query_id).await?;
    Ok(Json(json!({ "published": published })))
}

async fn load_query(state: &AppState, id: Uuid) -> ApiResult<Query> {
    state
        .engine
        .get_query(id)
        .await?
        .ok_or_else(|| ApiError::query_not_found(id))
}
