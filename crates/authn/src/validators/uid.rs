//! Token/user UID consistency check.

use super::TokenValidator;
use crate::errors::AuthnError;
use crate::models::{AccessTokenRecord, UserRecord};
use async_trait::async_trait;

/// Rejects tokens whose recorded user UID no longer matches the live user.
///
/// A mismatch means the user was deleted and recreated since the token was
/// issued; the token must not grant the new user's identity. Unlike lookup
/// failures this is an active inconsistency, so the error is surfaced
/// verbatim instead of being suppressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct UidValidator;

impl UidValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenValidator for UidValidator {
    async fn validate(
        &self,
        token: &AccessTokenRecord,
        user: &UserRecord,
    ) -> Result<(), AuthnError> {
        if user.uid != token.user_uid {
            return Err(AuthnError::UidMismatch {
                user_uid: user.uid.clone(),
                token_uid: token.user_uid.clone(),
            });
        }
        Ok(())
    }
}
