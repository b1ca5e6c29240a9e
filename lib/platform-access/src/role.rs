//! Account roles.
//!
//! Roles are stored on the account and embedded in access tokens, so the
//! wire names (`ROLE_USER`, `ROLE_ADMIN`) are part of the token format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authority granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Guest making and managing their own reservations.
    #[serde(rename = "ROLE_USER")]
    User,
    /// Staff with access to every reservation.
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::Admin => "ROLE_ADMIN",
        }
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_USER" => Ok(Self::User),
            "ROLE_ADMIN" => Ok(Self::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
