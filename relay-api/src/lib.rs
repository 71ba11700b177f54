//! Relay API - HTTP Surface
//!
//! Exposes the public query endpoint and the owner management API over
//! axum, and runs the tokio-backed refresh worker that drives the
//! engine's scheduled tasks.

pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod routes;
pub mod state;
pub mod task_queue;

pub use config::{OAuthConfig, RelayConfig};
pub use credentials::OAuthCredentialProvider;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use fetcher::HttpOriginFetcher;
pub use routes::create_router;
pub use state::AppState;
pub use task_queue::{RefreshWorker, TokioTaskQueue};
