//! Relay Engine - Refresh Scheduling and the Public Read Path
//!
//! Ties the storage tiers together: decides when a query is refreshed,
//! runs the fetch pipeline against the origin API, and serves cached
//! content to anonymous callers.

pub mod anonymize;
pub mod config;
pub mod dates;
pub mod engine;
pub mod pipeline;
pub mod policy;
pub mod read_path;
pub mod scheduler;
pub mod testing;
pub mod traits;
pub mod transform;

pub use anonymize::{remove_private_keys, PRIVATE_PROPERTIES};
pub use config::EngineConfig;
pub use dates::resolve_request_dates;
pub use engine::{Engine, QueryStatus};
pub use pipeline::FetchOutcome;
pub use policy::{format_timedelta, Policy};
pub use traits::{CredentialProvider, OriginFetcher, TaskQueue, TaskQueueError};
pub use transform::{JsonPassthrough, Transform, TransformError, TransformRegistry};
