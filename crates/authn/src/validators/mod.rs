//! Token validators applied after the record and user fetch.

mod inactivity;
mod uid;

pub use inactivity::InactivityValidator;
pub use uid::UidValidator;

use crate::errors::AuthnError;
use crate::models::{AccessTokenRecord, UserRecord};
use async_trait::async_trait;

/// A check applied to a fetched token record and its owning user.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Accept or reject the token.
    async fn validate(
        &self,
        token: &AccessTokenRecord,
        user: &UserRecord,
    ) -> Result<(), AuthnError>;
}
