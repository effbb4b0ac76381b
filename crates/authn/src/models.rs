//! Persisted record types and the authenticated identity.
//!
//! The serde layouts pin the persisted field names; they are part of the
//! external contract and must not drift.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `Identity.extra` key carrying the token's scopes.
pub const EXTRA_SCOPES: &str = "scopes";

/// `Identity.extra` key carrying the token's audiences.
pub const EXTRA_AUDIENCES: &str = "audiences";

/// Persisted access-token record.
///
/// The storage name is derived from the presented bearer by
/// [`crate::token_format::TokenFormatDecoder`]: the SHA-256 hash form for
/// prefixed tokens, the cleartext itself only for legacy records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRecord {
    /// Storage name the record is keyed under.
    pub name: String,

    /// When the token was issued.
    pub creation_timestamp: DateTime<Utc>,

    /// Name of the owning client record.
    pub client_name: String,

    /// Name of the owning user record.
    pub user_name: String,

    /// UID of the owning user at issuance time.
    #[serde(rename = "userUID")]
    pub user_uid: String,

    /// Lifetime in seconds from creation; past it the token is expired.
    pub expires_in: i32,

    /// Seconds from creation past which the token is inactive.
    /// 0 means no inactivity deadline is recorded.
    pub inactivity_timeout_seconds: i32,

    /// Scopes granted to the token.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Audiences the token was issued for.
    #[serde(default)]
    pub audiences: Vec<String>,
}

impl AccessTokenRecord {
    /// Wall time past which the token is expired outright.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.creation_timestamp + Duration::seconds(i64::from(self.expires_in))
    }

    /// Wall time past which the token is inactive, as persisted.
    ///
    /// Meaningless when `inactivity_timeout_seconds` is 0; callers check
    /// that first.
    #[must_use]
    pub fn inactivity_deadline(&self) -> DateTime<Utc> {
        self.creation_timestamp + Duration::seconds(i64::from(self.inactivity_timeout_seconds))
    }
}

/// Persisted client record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    /// Client name; token records point at it via `clientName`.
    pub name: String,

    /// Inactivity timeout configured for this client's tokens.
    /// `None` means use the system default; `Some(0)` means disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_inactivity_timeout_seconds: Option<i32>,
}

/// Persisted user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// User name; token records point at it via `userName`.
    pub name: String,

    /// Stable UID; changes when the user is deleted and recreated.
    pub uid: String,
}

/// Identity returned on successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Authenticated user name.
    pub name: String,

    /// Authenticated user UID.
    pub uid: String,

    /// Group memberships resolved for the user.
    pub groups: Vec<String>,

    /// Token-scoped attributes (scopes, audiences) keyed by
    /// [`EXTRA_SCOPES`] / [`EXTRA_AUDIENCES`].
    pub extra: HashMap<String, Vec<String>>,
}
