//! In-memory fake stores with fault injection.
//!
//! Each fake is a mutex-guarded map plus knobs for the failure modes the
//! production error handling must absorb: synthetic get errors, update
//! conflicts, failing group resolution.

use async_trait::async_trait;
use authn::errors::StoreError;
use authn::models::{AccessTokenRecord, ClientRecord, UserRecord};
use authn::stores::{AccessTokenStore, ClientLister, GroupMapper, UserStore};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory access-token store.
#[derive(Default)]
pub struct FakeTokenStore {
    records: Mutex<HashMap<String, AccessTokenRecord>>,
    get_error: Mutex<Option<String>>,
    conflict_next_updates: Mutex<u32>,
    update_count: Mutex<u64>,
}

impl FakeTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: AccessTokenRecord) {
        self.records
            .lock()
            .expect("token store poisoned")
            .insert(record.name.clone(), record);
    }

    pub fn remove(&self, name: &str) {
        self.records.lock().expect("token store poisoned").remove(name);
    }

    /// Read a record without going through the async trait, for assertions.
    #[must_use]
    pub fn get_sync(&self, name: &str) -> Option<AccessTokenRecord> {
        self.records
            .lock()
            .expect("token store poisoned")
            .get(name)
            .cloned()
    }

    /// Make every subsequent `get` fail with a synthetic backend error.
    pub fn fail_gets_with(&self, message: &str) {
        *self.get_error.lock().expect("token store poisoned") = Some(message.to_string());
    }

    /// Make the next `count` updates fail with a conflict.
    pub fn fail_next_updates(&self, count: u32) {
        *self.conflict_next_updates.lock().expect("token store poisoned") = count;
    }

    /// Number of updates that went through.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        *self.update_count.lock().expect("token store poisoned")
    }
}

#[async_trait]
impl AccessTokenStore for FakeTokenStore {
    async fn get(&self, name: &str) -> Result<AccessTokenRecord, StoreError> {
        if let Some(message) = self.get_error.lock().expect("token store poisoned").clone() {
            return Err(StoreError::Backend(message));
        }
        self.records
            .lock()
            .expect("token store poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn update(&self, record: AccessTokenRecord) -> Result<(), StoreError> {
        {
            let mut conflicts = self.conflict_next_updates.lock().expect("token store poisoned");
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(StoreError::Conflict(record.name));
            }
        }
        let mut records = self.records.lock().expect("token store poisoned");
        if !records.contains_key(&record.name) {
            return Err(StoreError::NotFound(record.name));
        }
        *self.update_count.lock().expect("token store poisoned") += 1;
        records.insert(record.name.clone(), record);
        Ok(())
    }
}

/// In-memory client store.
#[derive(Default)]
pub struct FakeClientStore {
    records: Mutex<HashMap<String, ClientRecord>>,
}

impl FakeClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ClientRecord) {
        self.records
            .lock()
            .expect("client store poisoned")
            .insert(record.name.clone(), record);
    }

    /// Reconfigure an existing client's inactivity timeout.
    ///
    /// # Panics
    ///
    /// Panics when the client does not exist; tests set clients up front.
    pub fn set_timeout(&self, name: &str, timeout_seconds: Option<i32>) {
        let mut records = self.records.lock().expect("client store poisoned");
        records
            .get_mut(name)
            .expect("unknown client")
            .access_token_inactivity_timeout_seconds = timeout_seconds;
    }
}

#[async_trait]
impl ClientLister for FakeClientStore {
    async fn get(&self, name: &str) -> Result<ClientRecord, StoreError> {
        self.records
            .lock()
            .expect("client store poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

/// In-memory user store.
#[derive(Default)]
pub struct FakeUserStore {
    records: Mutex<HashMap<String, UserRecord>>,
}

impl FakeUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: UserRecord) {
        self.records
            .lock()
            .expect("user store poisoned")
            .insert(record.name.clone(), record);
    }
}

#[async_trait]
impl UserStore for FakeUserStore {
    async fn get(&self, name: &str) -> Result<UserRecord, StoreError> {
        self.records
            .lock()
            .expect("user store poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

/// Group mapper returning a fixed set of groups.
pub struct StaticGroupMapper {
    groups: Vec<String>,
}

impl StaticGroupMapper {
    #[must_use]
    pub fn new(groups: Vec<String>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl GroupMapper for StaticGroupMapper {
    async fn groups(&self, _user: &UserRecord) -> Result<Vec<String>, StoreError> {
        Ok(self.groups.clone())
    }
}

/// Group mapper that always fails.
#[derive(Default)]
pub struct FailingGroupMapper;

#[async_trait]
impl GroupMapper for FailingGroupMapper {
    async fn groups(&self, _user: &UserRecord) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Backend("group resolution failed".to_string()))
    }
}
