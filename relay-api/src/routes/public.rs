//! The anonymous public endpoint
//!
//! `GET /query?id=<uuid>&format=<name>` serves the cached content for
//! one query. Errors are always rendered as the engine's structured
//! payload in the default format, regardless of the requested one.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use relay_core::error::RelayError;
use relay_core::format::OutputFormat;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PublicParams {
    pub id: Option<String>,
    pub format: Option<String>,
}

pub async fn serve_query(
    State(state): State<AppState>,
    Query(params): Query<PublicParams>,
) -> Response {
    let format = OutputFormat::parse(params.format.as_deref());
    let id = params.id.unwrap_or_default();

    match state.engine.serve_public_request(&id, format).await {
        Ok((content, status)) => (status_code(status), Json(content)).into_response(),
        Err(RelayError::Proxy(proxy)) => {
            (status_code(proxy.status), Json(proxy.content)).into_response()
        }
        Err(e) => {
            error!(error = %e, "public read failed");
            ApiError::internal_error("The query could not be served").into_response()
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
