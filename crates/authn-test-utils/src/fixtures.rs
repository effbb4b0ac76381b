//! Record fixtures and builders.

use authn::models::{AccessTokenRecord, ClientRecord, UserRecord};
use authn::token_format::{hashed_name, SHA256_PREFIX};
use chrono::{DateTime, Utc};

/// A cleartext bearer and the storage name its record is keyed under.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// What the wire client presents.
    pub bearer: String,
    /// What the store keys the record by.
    pub storage_name: String,
}

/// Build the bearer/storage-name pair for a prefixed token secret.
#[must_use]
pub fn token_pair(secret: &str) -> TokenPair {
    TokenPair {
        bearer: format!("{SHA256_PREFIX}{secret}"),
        storage_name: hashed_name(secret),
    }
}

/// Fluent builder for access-token records.
///
/// Defaults: owned by user `foo`/`bar`, no client, 600 second lifetime, no
/// inactivity deadline.
pub struct TokenRecordBuilder {
    record: AccessTokenRecord,
}

/// Start a token record named `name`, created at `created_at`.
#[must_use]
pub fn token_record(name: &str, created_at: DateTime<Utc>) -> TokenRecordBuilder {
    TokenRecordBuilder {
        record: AccessTokenRecord {
            name: name.to_string(),
            creation_timestamp: created_at,
            client_name: String::new(),
            user_name: "foo".to_string(),
            user_uid: "bar".to_string(),
            expires_in: 600,
            inactivity_timeout_seconds: 0,
            scopes: Vec::new(),
            audiences: Vec::new(),
        },
    }
}

impl TokenRecordBuilder {
    #[must_use]
    pub fn for_client(mut self, name: &str) -> Self {
        self.record.client_name = name.to_string();
        self
    }

    #[must_use]
    pub fn for_user(mut self, name: &str, uid: &str) -> Self {
        self.record.user_name = name.to_string();
        self.record.user_uid = uid.to_string();
        self
    }

    #[must_use]
    pub fn expires_in(mut self, seconds: i32) -> Self {
        self.record.expires_in = seconds;
        self
    }

    #[must_use]
    pub fn inactivity_timeout(mut self, seconds: i32) -> Self {
        self.record.inactivity_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.record.scopes = scopes.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_audiences(mut self, audiences: &[&str]) -> Self {
        self.record.audiences = audiences.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn build(self) -> AccessTokenRecord {
        self.record
    }
}

/// Client record fixture.
#[must_use]
pub fn client_record(name: &str, timeout_seconds: Option<i32>) -> ClientRecord {
    ClientRecord {
        name: name.to_string(),
        access_token_inactivity_timeout_seconds: timeout_seconds,
    }
}

/// User record fixture.
#[must_use]
pub fn user_record(name: &str, uid: &str) -> UserRecord {
    UserRecord {
        name: name.to_string(),
        uid: uid.to_string(),
    }
}
