//! Error types and the error-opacity shell.
//!
//! Internally the pipeline keeps distinct error values so logs stay useful.
//! Externally only three classes exist: the opaque lookup failure, the
//! inactivity timeout, and the UID mismatch. [`AuthnError::suppressed`] is
//! the translation layer between the two worlds.

use thiserror::Error;

/// Errors surfaced by the storage collaborators (token store, client lister,
/// user store, group mapper).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the given name.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The record changed between read and write.
    #[error("update conflict on record: {0}")]
    Conflict(String),

    /// The backend failed in some other way.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Authentication errors.
///
/// Only [`AuthnError::Lookup`], [`AuthnError::Timedout`] and
/// [`AuthnError::UidMismatch`] may cross the public boundary; everything else
/// is collapsed by [`AuthnError::suppressed`] before
/// [`crate::TokenAuthenticator::authenticate_token`] returns. An attacker
/// probing bearer strings must not be able to distinguish "no such token"
/// from "store down" from "malformed".
#[derive(Debug, Error)]
pub enum AuthnError {
    /// No authenticatable token exists for this bearer. The only external
    /// signal for every suppressed failure class.
    #[error("token lookup failed")]
    Lookup,

    /// The token exists but its inactivity window has closed.
    #[error("token timed out")]
    Timedout,

    /// The token's recorded user UID does not match the live user record.
    ///
    /// The message wording is an external contract; audit tooling matches it
    /// verbatim.
    #[error("user.UID ({user_uid}) does not match token.userUID ({token_uid})")]
    UidMismatch {
        /// UID carried by the live user record.
        user_uid: String,
        /// UID recorded on the token at issuance.
        token_uid: String,
    },

    /// The bearer string does not parse as any supported token format.
    #[error("invalid bearer token format")]
    InvalidFormat,

    /// The token's `expiresIn` lifetime has passed.
    #[error("token expired")]
    Expired,

    /// The caller's cancellation context fired mid-pipeline.
    #[error("operation cancelled")]
    Cancelled,

    /// A storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthnError {
    /// Collapse internal failure classes into the external surface.
    ///
    /// Timeouts and UID mismatches pass through unchanged; every other
    /// variant aliases to [`AuthnError::Lookup`].
    #[must_use]
    pub fn suppressed(self) -> Self {
        match self {
            AuthnError::Timedout | AuthnError::UidMismatch { .. } => self,
            _ => AuthnError::Lookup,
        }
    }
}
