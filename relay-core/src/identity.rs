//! Identity types for Relay entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Query identifier using UUIDv7 for timestamp-sortable IDs.
pub type QueryId = Uuid;

/// Owner (account) identifier.
pub type OwnerId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 QueryId (timestamp-sortable).
pub fn new_query_id() -> QueryId {
    Uuid::now_v7()
}

/// Generate a new UUIDv7 OwnerId.
pub fn new_owner_id() -> OwnerId {
    Uuid::now_v7()
}
