//! Storage seams consumed by the authentication pipeline.
//!
//! The record store, client lister, user store and group mapper are external
//! collaborators; this crate only defines their contracts. Deterministic
//! in-memory implementations live in the `authn-test-utils` crate.

use crate::errors::StoreError;
use crate::models::{AccessTokenRecord, ClientRecord, UserRecord};
use async_trait::async_trait;

/// Read/update access to persisted access-token records.
#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    /// Fetch a token record by storage name.
    async fn get(&self, name: &str) -> Result<AccessTokenRecord, StoreError>;

    /// Persist an updated token record.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Conflict`] when the record changed since it
    /// was read; callers drop and retry from a fresh read.
    async fn update(&self, record: AccessTokenRecord) -> Result<(), StoreError>;
}

/// Read access to client records.
#[async_trait]
pub trait ClientLister: Send + Sync {
    /// Fetch a client record by name.
    async fn get(&self, name: &str) -> Result<ClientRecord, StoreError>;
}

/// Read access to user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user record by name.
    async fn get(&self, name: &str) -> Result<UserRecord, StoreError>;
}

/// Derives group memberships for an authenticated user.
#[async_trait]
pub trait GroupMapper: Send + Sync {
    /// Resolve the groups `user` belongs to.
    async fn groups(&self, user: &UserRecord) -> Result<Vec<String>, StoreError>;
}

/// Group mapper that assigns no groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGroupMapper;

#[async_trait]
impl GroupMapper for NoopGroupMapper {
    async fn groups(&self, _user: &UserRecord) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_group_mapper_returns_empty() {
        let user = UserRecord {
            name: "foo".to_string(),
            uid: "bar".to_string(),
        };
        let groups = NoopGroupMapper.groups(&user).await.unwrap();
        assert!(groups.is_empty());
    }
}
