//! Error types for Relay operations

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Record type discriminator used in storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Query,
    Response,
    ErrorRecord,
    CounterShard,
    TimestampShard,
    ShardConfig,
    Owner,
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {record_type:?} with id {id}")]
    NotFound { record_type: RecordType, id: Uuid },

    #[error("Backend error: {reason}")]
    Backend { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors for owner form input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Field {field} too long: {len} characters (max {max})")]
    TooLong { field: String, len: usize, max: usize },

    #[error("Field {field} out of range: {value} (allowed {min}..{max})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors from a single origin fetch attempt.
///
/// These are absorbed into query state (error records, unset schedule flag)
/// rather than propagated: the proxy keeps serving the last good response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("Fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("Origin returned non-JSON body: {reason}")]
    BadBody { reason: String },
}

impl OriginError {
    /// The payload stored in an error record for this failure, matching the
    /// shape of an API-reported error body.
    pub fn payload(&self) -> Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// Typed public-facing proxy error carrying the exact content and HTTP
/// status to render. Raised only by the read path when nothing is servable.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("proxy error with status {status}")]
pub struct ProxyError {
    pub content: Value,
    pub status: u16,
}

impl ProxyError {
    pub fn new(content: Value, status: u16) -> Self {
        Self { content, status }
    }
}

/// Umbrella error for Relay operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelayError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// Result alias used throughout the workspace.
pub type RelayResult<T> = Result<T, RelayError>;
