//! Account domain type and login identifiers.
//!
//! An account is keyed by its login id, which is globally unique. For
//! federated accounts the login id *is* the encoded canonical identity
//! (`<provider>_<externalId>`); local signups choose their own.

use chrono::{DateTime, Utc};
use hotelres_core::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identity::{CanonicalIdentity, is_placeholder_email};
use crate::role::Role;

/// Password hash stored for federated accounts.
///
/// It is not a valid hash in any supported scheme, so no password can ever
/// verify against it.
pub const FEDERATED_PASSWORD_SENTINEL: &str = "{federated}!";

/// Minimum length of a locally chosen login id.
const LOCAL_LOGIN_ID_MIN_LEN: usize = 6;

/// Error returned when a locally chosen login id breaks the signup rule.
///
/// Raised to the local signup flow, which lives outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLoginId {
    /// The rejected value.
    pub value: String,
}

impl fmt::Display for InvalidLoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "login id '{}' must be at least {LOCAL_LOGIN_ID_MIN_LEN} ASCII letters or digits",
            self.value
        )
    }
}

impl std::error::Error for InvalidLoginId {}

/// Globally unique login identifier of an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoginId(String);

impl LoginId {
    /// Encodes a canonical identity as a login id.
    #[must_use]
    pub fn federated(identity: &CanonicalIdentity) -> Self {
        Self(format!(
            "{}_{}",
            identity.provider().as_str(),
            identity.external_id()
        ))
    }

    /// Validates a login id chosen during local signup.
    ///
    /// Local signup is owned by an external collaborator; this is the rule it
    /// must apply before persisting an account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLoginId` unless the value is at least six ASCII
    /// letters or digits. The underscore is excluded, so local ids can never
    /// collide with federated ones.
    pub fn local(value: impl Into<String>) -> Result<Self, InvalidLoginId> {
        let value = value.into();
        let valid = value.len() >= LOCAL_LOGIN_ID_MIN_LEN
            && value.chars().all(|c| c.is_ascii_alphanumeric());
        if valid {
            Ok(Self(value))
        } else {
            Err(InvalidLoginId { value })
        }
    }

    /// Wraps a login id read back from storage or a verified token.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the login id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
}

impl AccountStatus {
    /// Returns the stored name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            other => Err(format!("unknown account status: {other}")),
        }
    }
}

/// A local account of the reservation application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal row id.
    id: AccountId,
    /// Unique login identifier.
    login_id: LoginId,
    /// Password hash, or [`FEDERATED_PASSWORD_SENTINEL`].
    password_hash: String,
    display_name: String,
    email: String,
    status: AccountStatus,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a just-in-time account for a first federated login.
    ///
    /// The account is active, has the user role, and carries no usable
    /// local credential.
    #[must_use]
    pub fn federated(login_id: LoginId, display_name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            login_id,
            password_hash: FEDERATED_PASSWORD_SENTINEL.to_string(),
            display_name,
            email,
            status: AccountStatus::Active,
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an account with all fields specified.
    ///
    /// Use this when reconstituting an account from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: AccountId,
        login_id: LoginId,
        password_hash: String,
        display_name: String,
        email: String,
        status: AccountStatus,
        role: Role,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            login_id,
            password_hash,
            display_name,
            email,
            status,
            role,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    #[must_use]
    pub fn login_id(&self) -> &LoginId {
        &self.login_id
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn status(&self) -> AccountStatus {
        self.status
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if a local password can authenticate this account.
    ///
    /// False for federated accounts. Used by the external password-login flow.
    #[must_use]
    pub fn has_local_credential(&self) -> bool {
        self.password_hash != FEDERATED_PASSWORD_SENTINEL
    }

    /// Returns true if the account may be issued new tokens.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Returns true if the stored email was synthesized at provisioning.
    ///
    /// Features that send mail must skip these accounts.
    #[must_use]
    pub fn has_placeholder_email(&self) -> bool {
        is_placeholder_email(&self.email)
    }
}
