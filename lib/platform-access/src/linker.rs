//! Mapping canonical identities to local accounts.

use crate::account::{Account, LoginId};
use crate::error::{AccountError, StoreError};
use crate::identity::CanonicalIdentity;
use crate::store::AccountStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Resolves the account for a canonical identity, provisioning it on first login.
///
/// Existing accounts are returned unchanged: after creation the stored
/// record, not the provider payload, is the source of truth for name and
/// email.
#[derive(Clone)]
pub struct AccountLinker {
    store: Arc<dyn AccountStore>,
    store_timeout: Duration,
}

impl std::fmt::Debug for AccountLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLinker")
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl AccountLinker {
    /// Creates a linker over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Sets the bound applied to each store call.
    #[must_use]
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Returns the existing account for `identity`, or creates one.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails or exceeds the timeout,
    /// and `LookupFailed` if creation lost a race but the winning account
    /// cannot be read back.
    #[instrument(
        skip(self, fallback_name, fallback_email),
        fields(provider = %identity.provider())
    )]
    pub async fn link_or_create(
        &self,
        identity: &CanonicalIdentity,
        fallback_name: &str,
        fallback_email: &str,
    ) -> Result<Account, AccountError> {
        let login_id = identity.login_id();

        if let Some(existing) = self.find(&login_id).await? {
            debug!(login_id = %login_id, "linked existing account");
            return Ok(existing);
        }

        let candidate = Account::federated(
            login_id.clone(),
            fallback_name.to_string(),
            fallback_email.to_string(),
        );

        match self.bounded(self.store.create(candidate)).await {
            Ok(created) => {
                info!(login_id = %login_id, "provisioned federated account");
                Ok(created)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                // A concurrent first login won the insert; converge on its row.
                debug!(login_id = %login_id, "lost account creation race");
                self.find(&login_id)
                    .await?
                    .ok_or_else(|| AccountError::LookupFailed {
                        login_id: login_id.to_string(),
                    })
            }
            Err(err) => {
                warn!(login_id = %login_id, error = %err, "account creation failed");
                Err(err.into())
            }
        }
    }

    /// Looks up an account by login id under the store timeout.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store fails or exceeds the timeout.
    pub async fn find(&self, login_id: &LoginId) -> Result<Option<Account>, AccountError> {
        self.bounded(self.store.find_by_login_id(login_id))
            .await
            .map_err(AccountError::from)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Unavailable {
                details: format!(
                    "no answer within {} ms",
                    self.store_timeout.as_millis()
                ),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStatus;
    use crate::provider::Provider;
    use crate::role::Role;
    use crate::store::InMemoryAccountStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that reports a lost race: the first lookup misses, the insert
    /// conflicts, and later lookups see the winner's row.
    struct RacingStore {
        winner: Account,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl AccountStore for RacingStore {
        async fn find_by_login_id(
            &self,
            _login_id: &LoginId,
        ) -> Result<Option<Account>, StoreError> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(None)
            } else {
                Ok(Some(self.winner.clone()))
            }
        }

        async fn create(&self, account: Account) -> Result<Account, StoreError> {
            Err(StoreError::AlreadyExists {
                login_id: account.login_id().to_string(),
            })
        }
    }

    struct DownStore;

    #[async_trait]
    impl AccountStore for DownStore {
        async fn find_by_login_id(
            &self,
            _login_id: &LoginId,
        ) -> Result<Option<Account>, StoreError> {
            Err(StoreError::Unavailable {
                details: "connection refused".to_string(),
            })
        }

        async fn create(&self, _account: Account) -> Result<Account, StoreError> {
            Err(StoreError::Unavailable {
                details: "connection refused".to_string(),
            })
        }
    }

    struct SlowStore;

    #[async_trait]
    impl AccountStore for SlowStore {
        async fn find_by_login_id(
            &self,
            _login_id: &LoginId,
        ) -> Result<Option<Account>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn create(&self, account: Account) -> Result<Account, StoreError> {
            Ok(account)
        }
    }

    /// Store whose inserts never become visible, so a conflict cannot converge.
    #[derive(Default)]
    struct VanishingStore {
        creates: Mutex<usize>,
    }

    #[async_trait]
    impl AccountStore for VanishingStore {
        async fn find_by_login_id(
            &self,
            _login_id: &LoginId,
        ) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }

        async fn create(&self, account: Account) -> Result<Account, StoreError> {
            *self.creates.lock().unwrap() += 1;
            Err(StoreError::AlreadyExists {
                login_id: account.login_id().to_string(),
            })
        }
    }

    fn kakao(id: &str) -> CanonicalIdentity {
        CanonicalIdentity::new(Provider::Kakao, id)
    }

    #[tokio::test]
    async fn creates_account_on_first_login() {
        let store = Arc::new(InMemoryAccountStore::new());
        let linker = AccountLinker::new(store.clone());

        let account = linker
            .link_or_create(&kakao("555"), "KAKAO user", "kakao_555@placeholder.invalid")
            .await
            .expect("link");

        assert_eq!(account.login_id().as_str(), "kakao_555");
        assert_eq!(account.display_name(), "KAKAO user");
        assert_eq!(account.email(), "kakao_555@placeholder.invalid");
        assert_eq!(account.status(), AccountStatus::Active);
        assert_eq!(account.role(), Role::User);
        assert!(!account.has_local_credential());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn second_login_returns_existing_account_unchanged() {
        let store = Arc::new(InMemoryAccountStore::new());
        let linker = AccountLinker::new(store.clone());

        let first = linker
            .link_or_create(&kakao("555"), "Old Name", "old@example.com")
            .await
            .expect("first link");
        let second = linker
            .link_or_create(&kakao("555"), "New Name", "new@example.com")
            .await
            .expect("second link");

        assert_eq!(first, second);
        assert_eq!(second.display_name(), "Old Name");
        assert_eq!(second.email(), "old@example.com");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_logins_converge_on_one_account() {
        let store = Arc::new(InMemoryAccountStore::new());
        let linker = AccountLinker::new(store.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let linker = linker.clone();
                tokio::spawn(async move {
                    linker
                        .link_or_create(
                            &kakao("555"),
                            "KAKAO user",
                            "kakao_555@placeholder.invalid",
                        )
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            let account = handle.await.expect("join").expect("link");
            ids.push(account.id());
        }

        assert_eq!(store.len(), 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[tokio::test]
    async fn losing_creator_returns_winners_account() {
        let winner = Account::federated(
            kakao("9").login_id(),
            "Winner".to_string(),
            "winner@example.com".to_string(),
        );
        let store = Arc::new(RacingStore {
            winner: winner.clone(),
            lookups: AtomicUsize::new(0),
        });
        let linker = AccountLinker::new(store);

        let account = linker
            .link_or_create(&kakao("9"), "Loser", "loser@example.com")
            .await
            .expect("link");

        assert_eq!(account, winner);
    }

    #[tokio::test]
    async fn conflict_without_visible_winner_fails_lookup() {
        let store = Arc::new(VanishingStore::default());
        let linker = AccountLinker::new(store.clone());

        let err = linker
            .link_or_create(&kakao("1"), "n", "e")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AccountError::LookupFailed {
                login_id: "kakao_1".to_string()
            }
        );
        assert_eq!(*store.creates.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_aborts() {
        let linker = AccountLinker::new(Arc::new(DownStore));

        let err = linker
            .link_or_create(&kakao("1"), "n", "e")
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn store_timeout_maps_to_unavailable() {
        let linker =
            AccountLinker::new(Arc::new(SlowStore)).with_store_timeout(Duration::from_millis(20));

        let err = linker
            .link_or_create(&kakao("1"), "n", "e")
            .await
            .unwrap_err();

        match err {
            AccountError::StoreUnavailable { details } => assert!(details.contains("20 ms")),
            other => panic!("expected StoreUnavailable, got {other:?}"),
        }
    }
}
