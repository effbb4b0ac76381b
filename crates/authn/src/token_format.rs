//! Bearer-string to storage-name decoding.
//!
//! Prefixed bearers (`sha256~<secret>`) never reach storage in the clear:
//! the record is keyed under `sha256~<base64url(sha256(secret))>`, so a
//! leaked storage name cannot be replayed as a bearer. Unprefixed bearers
//! are rejected unless legacy lookup is explicitly enabled.

use crate::errors::AuthnError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::digest;

/// Prefix carried by hashed bearer tokens and their storage names.
pub const SHA256_PREFIX: &str = "sha256~";

/// Maps a presented bearer string to the storage name of its record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenFormatDecoder {
    legacy_lookup: bool,
}

impl TokenFormatDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow unprefixed bearers to match unprefixed storage names.
    ///
    /// Off by default. Prefixed storage names stay unreachable from
    /// unprefixed bearers in either mode: only the hash path can produce a
    /// `sha256~` storage name.
    #[must_use]
    pub fn with_legacy_lookup(mut self, enabled: bool) -> Self {
        self.legacy_lookup = enabled;
        self
    }

    /// Derive the storage name for `bearer`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthnError::InvalidFormat`] for an empty prefixed secret
    /// and for any unprefixed bearer while legacy lookup is disabled.
    pub fn decode(&self, bearer: &str) -> Result<String, AuthnError> {
        if let Some(secret) = bearer.strip_prefix(SHA256_PREFIX) {
            if secret.is_empty() {
                return Err(AuthnError::InvalidFormat);
            }
            return Ok(hashed_name(secret));
        }
        if self.legacy_lookup && !bearer.is_empty() {
            return Ok(bearer.to_string());
        }
        Err(AuthnError::InvalidFormat)
    }
}

/// Storage name for the prefixed bearer carrying `secret`.
#[must_use]
pub fn hashed_name(secret: &str) -> String {
    let hash = digest::digest(&digest::SHA256, secret.as_bytes());
    format!("{SHA256_PREFIX}{}", URL_SAFE_NO_PAD.encode(hash.as_ref()))
}
