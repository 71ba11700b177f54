//! Route registration.

pub mod health;
pub mod management;
pub mod public;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full router: the anonymous public endpoint, the owner
/// management API under `/api`, and health checks.
pub fn create_router(state: AppState) -> Router {
    let management = Router::new()
        .route(
            "/queries",
            post(management::create_query).get(management::list_queries),
        )
        .route(
            "/queries/:id",
            get(management::get_query)
                .put(management::update_query)
                .delete(management::delete_query),
        )
        .route("/queries/:id/start", post(management::start_query))
        .route(
            "/queries/:id/public-status",
            post(management::set_public_status),
        )
        .route(
            "/queries/:id/schedule-status",
            post(management::set_schedule_status),
        )
        .route(
            "/queries/:id/errors",
            get(management::list_errors).delete(management::delete_errors),
        )
        .route("/tasks/refresh", post(management::run_refresh_task));

    Router::new()
        .route("/query", get(public::serve_query))
        .nest("/api", management)
        .route("/health/ping", get(health::ping))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
