//! The bearer-token authentication pipeline.
//!
//! Decode the bearer into a storage name, fetch the record, check expiry,
//! fetch the owning user, check UID consistency, resolve groups, run the
//! inactivity check, return the identity. The suppression shell sits at the
//! public boundary: apart from UID mismatches and inactivity timeouts, every
//! failure leaves as the opaque [`AuthnError::Lookup`].

use crate::clock::Clock;
use crate::errors::AuthnError;
use crate::models::{AccessTokenRecord, Identity, UserRecord, EXTRA_AUDIENCES, EXTRA_SCOPES};
use crate::stores::{AccessTokenStore, GroupMapper, UserStore};
use crate::token_format::TokenFormatDecoder;
use crate::validators::{InactivityValidator, TokenValidator, UidValidator};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Authenticates presented bearer strings against the record store.
pub struct TokenAuthenticator {
    decoder: TokenFormatDecoder,
    tokens: Arc<dyn AccessTokenStore>,
    users: Arc<dyn UserStore>,
    group_mapper: Arc<dyn GroupMapper>,
    uid_validator: UidValidator,
    inactivity: Option<Arc<InactivityValidator>>,
    clock: Arc<dyn Clock>,
}

impl TokenAuthenticator {
    pub fn new(
        tokens: Arc<dyn AccessTokenStore>,
        users: Arc<dyn UserStore>,
        group_mapper: Arc<dyn GroupMapper>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            decoder: TokenFormatDecoder::new(),
            tokens,
            users,
            group_mapper,
            uid_validator: UidValidator::new(),
            inactivity: None,
            clock,
        }
    }

    /// Attach the inactivity validator. Without one, the inactivity check is
    /// skipped entirely.
    #[must_use]
    pub fn with_inactivity_validator(mut self, validator: Arc<InactivityValidator>) -> Self {
        self.inactivity = Some(validator);
        self
    }

    /// Replace the bearer decoder, e.g. to enable legacy lookup.
    #[must_use]
    pub fn with_decoder(mut self, decoder: TokenFormatDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Authenticate a presented bearer string.
    ///
    /// On success returns the owning user's identity, with the token's
    /// scopes and audiences in `extra`.
    ///
    /// # Errors
    ///
    /// - [`AuthnError::UidMismatch`] when the live user's UID differs from
    ///   the one recorded on the token.
    /// - [`AuthnError::Timedout`] when the token's inactivity window closed.
    /// - [`AuthnError::Lookup`] for everything else: unknown or malformed
    ///   bearers, expired tokens, failing collaborators, cancellation. The
    ///   aliasing is deliberate; see [`crate::errors`].
    pub async fn authenticate_token(
        &self,
        ctx: &CancellationToken,
        bearer: &str,
    ) -> Result<Identity, AuthnError> {
        self.authenticate_inner(ctx, bearer)
            .await
            .map_err(AuthnError::suppressed)
    }

    async fn authenticate_inner(
        &self,
        ctx: &CancellationToken,
        bearer: &str,
    ) -> Result<Identity, AuthnError> {
        let name = self.decoder.decode(bearer)?;

        let token = cancellable(ctx, self.tokens.get(&name)).await??;

        if token.expires_at() <= self.clock.now() {
            debug!(target: "authn.authenticator", token = %token.name, "Token expired");
            return Err(AuthnError::Expired);
        }

        let user = cancellable(ctx, self.users.get(&token.user_name)).await??;

        self.uid_validator.validate(&token, &user).await?;

        let groups = cancellable(ctx, self.group_mapper.groups(&user)).await??;

        if let Some(inactivity) = &self.inactivity {
            cancellable(ctx, inactivity.validate(&token, &user)).await??;
        }

        debug!(
            target: "authn.authenticator",
            user = %user.name,
            client = %token.client_name,
            "Token authenticated"
        );
        Ok(identity(&token, user, groups))
    }
}

/// Race `fut` against the caller's cancellation.
async fn cancellable<T>(
    ctx: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, AuthnError> {
    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(AuthnError::Cancelled),
        out = fut => Ok(out),
    }
}

fn identity(token: &AccessTokenRecord, user: UserRecord, groups: Vec<String>) -> Identity {
    let mut extra = HashMap::new();
    if !token.scopes.is_empty() {
        extra.insert(EXTRA_SCOPES.to_string(), token.scopes.clone());
    }
    if !token.audiences.is_empty() {
        extra.insert(EXTRA_AUDIENCES.to_string(), token.audiences.clone());
    }
    Identity {
        name: user.name,
        uid: user.uid,
        groups,
        extra,
    }
}
