//! Strongly-typed identifiers for persisted entities.
//!
//! Account row keys use ULID, which keeps them unique across server
//! processes and sortable by creation time. The login identifier is a
//! separate, user-facing key and lives on the account itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Prefix used when an [`AccountId`] is displayed.
const ACCOUNT_PREFIX: &str = "acct";

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Internal primary key of an account row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Ulid);

impl AccountId {
    /// Creates a new ID with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates an ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ACCOUNT_PREFIX}_{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Stored rows use the prefixed form; raw ULIDs are accepted too.
        let raw = s
            .strip_prefix(ACCOUNT_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
            id_type: "AccountId",
            reason: e.to_string(),
        })
    }
}

impl From<Ulid> for AccountId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_display_format() {
        let id = AccountId::new();
        assert!(id.to_string().starts_with("acct_"));
    }

    #[test]
    fn parse_with_prefix() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_without_prefix() {
        let ulid = Ulid::new();
        let id: AccountId = ulid.to_string().parse().expect("should parse");
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "acct_not_a_ulid".parse::<AccountId>().unwrap_err();
        assert_eq!(err.id_type, "AccountId");
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = AccountId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
