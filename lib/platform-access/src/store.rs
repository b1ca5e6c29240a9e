//! Account storage collaborator.
//!
//! The store is the only shared mutable resource of the subsystem. Creation
//! must be compare-and-create per login id: when two writers race, exactly
//! one succeeds and the other receives [`StoreError::AlreadyExists`].

use crate::account::{Account, LoginId};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Trait for account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds an account by its login id.
    async fn find_by_login_id(&self, login_id: &LoginId) -> Result<Option<Account>, StoreError>;

    /// Persists a new account.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the login id is taken, leaving the stored
    /// account untouched, and `Unavailable` if the store cannot be reached.
    async fn create(&self, account: Account) -> Result<Account, StoreError>;
}

/// Account store held in process memory.
///
/// Used for tests and single-process development; it honours the same
/// compare-and-create contract as the database store.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<LoginId, Account>>,
}

impl InMemoryAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with existing accounts.
    #[must_use]
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.login_id().clone(), account))
            .collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    /// Returns the number of stored accounts.
    ///
    /// Reads through a poisoned lock: every insert is a single map operation,
    /// so the count is still accurate. Lookups and creation report the
    /// poisoning as `Unavailable`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no accounts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<LoginId, Account>>, StoreError> {
        self.accounts.lock().map_err(|_| StoreError::Unavailable {
            details: "in-memory account store poisoned".to_string(),
        })
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_login_id(&self, login_id: &LoginId) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.get(login_id).cloned())
    }

    async fn create(&self, account: Account) -> Result<Account, StoreError> {
        let mut accounts = self.lock()?;
        if accounts.contains_key(account.login_id()) {
            return Err(StoreError::AlreadyExists {
                login_id: account.login_id().to_string(),
            });
        }
        accounts.insert(account.login_id().clone(), account.clone());
        Ok(account)
    }
}
