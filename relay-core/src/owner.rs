//! Owner account record.

use crate::identity::{OwnerId, Timestamp};
use serde::{Deserialize, Serialize};

/// An account that owns queries and carries origin credentials.
///
/// The credential fields back the refresh-token flow: `access_token` is
/// replaced whenever it expires, `refresh_token` is long-lived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub email: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub token_expiry: Option<Timestamp>,
}

impl Owner {
    pub fn new(id: OwnerId, email: String) -> Self {
        Self {
            id,
            email,
            refresh_token: None,
            access_token: None,
            token_expiry: None,
        }
    }

    /// Whether the stored access token is still usable at `now`.
    pub fn token_valid_at(&self, now: Timestamp) -> bool {
        match (&self.access_token, self.token_expiry) {
            (Some(_), Some(expiry)) => expiry > now,
            _ => false,
        }
    }
}
