//! PostgreSQL account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotelres_core::AccountId;
use hotelres_platform_access::{
    Account, AccountStatus, AccountStore, LoginId, Role, StoreError,
};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for account queries.
#[derive(FromRow)]
struct AccountRow {
    id: String,
    login_id: String,
    password_hash: String,
    display_name: String,
    email: String,
    status: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn try_into_account(self) -> Result<Account, sqlx::Error> {
        let id = AccountId::from_str(&self.id).map_err(|e| decode_error(&self.id, e))?;
        let status =
            AccountStatus::from_str(&self.status).map_err(|e| decode_error(&self.status, e))?;
        let role = Role::from_str(&self.role).map_err(|e| decode_error(&self.role, e))?;
        Ok(Account::with_all_fields(
            id,
            LoginId::from_stored(self.login_id),
            self.password_hash,
            self.display_name,
            self.email,
            status,
            role,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn decode_error(value: &str, err: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid account column '{value}': {err}"),
    )))
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        details: err.to_string(),
    }
}

/// [`AccountStore`] over the `accounts` table.
///
/// Creation relies on the unique `login_id` constraint, so concurrent first
/// logins are serialized by the database rather than in-process.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Creates a new account store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_login_id(&self, login_id: &LoginId) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, login_id, password_hash, display_name, email, status, role, created_at, updated_at
            FROM accounts
            WHERE login_id = $1
            "#,
        )
        .bind(login_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some(r) => Ok(Some(r.try_into_account().map_err(unavailable)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, account: Account) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            INSERT INTO accounts (id, login_id, password_hash, display_name, email, status, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (login_id) DO NOTHING
            RETURNING id, login_id, password_hash, display_name, email, status, role, created_at, updated_at
            "#,
        )
        .bind(account.id().to_string())
        .bind(account.login_id().as_str())
        .bind(account.password_hash())
        .bind(account.display_name())
        .bind(account.email())
        .bind(account.status().as_str())
        .bind(account.role().as_str())
        .bind(account.created_at())
        .bind(account.updated_at())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some(r) => r.try_into_account().map_err(unavailable),
            None => Err(StoreError::AlreadyExists {
                login_id: account.login_id().to_string(),
            }),
        }
    }
}
