//! Error types for the platform-access crate.
//!
//! Leaf components return plain enums so callers can match on them:
//! - `IdentityError`: provider payload could not be normalized
//! - `StoreError`: the account store collaborator failed or refused a write
//! - `AccountError`: the account linker could not resolve an account
//! - `TokenError`: a token could not be issued or verified
//! - `AuthorizationError`: a request lacks the context a path requires
//!
//! `FederationError` is the context carried by the federation handler's
//! rootcause reports.

use crate::token::TokenKind;
use std::fmt;

/// Errors from normalizing a provider's user-info payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The federation source is not one of the supported providers.
    UnsupportedProvider { provider: String },
    /// The payload has no usable external identifier.
    MissingExternalId { provider: String },
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProvider { provider } => {
                write!(f, "unsupported identity provider: {provider}")
            }
            Self::MissingExternalId { provider } => {
                write!(f, "{provider} user-info payload has no external id")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Errors reported by an [`AccountStore`](crate::store::AccountStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An account with this login id already exists.
    AlreadyExists { login_id: String },
    /// The store could not be reached or the query failed.
    Unavailable { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists { login_id } => {
                write!(f, "account '{login_id}' already exists")
            }
            Self::Unavailable { details } => {
                write!(f, "account store unavailable: {details}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from resolving an account for a canonical identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// The store failed or did not answer in time.
    StoreUnavailable { details: String },
    /// Creation lost a race but the winning account could not be read back.
    LookupFailed { login_id: String },
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable { details } => {
                write!(f, "account store unavailable: {details}")
            }
            Self::LookupFailed { login_id } => {
                write!(f, "account '{login_id}' could not be looked up")
            }
        }
    }
}

impl std::error::Error for AccountError {}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { details } => Self::StoreUnavailable { details },
            StoreError::AlreadyExists { login_id } => Self::LookupFailed { login_id },
        }
    }
}

/// Errors from issuing or verifying tokens.
///
/// The verification variants are internal diagnostics only. Anything that
/// answers a client collapses them into a single "invalid token" outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token's validity window has passed.
    Expired,
    /// The token could not be decoded or is missing required claims.
    Malformed,
    /// The signature does not match the signing secret.
    BadSignature,
    /// A token of one kind was presented where another was required.
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
    /// Signing a claim set failed.
    Signing { reason: String },
    /// The issuer configuration violates its invariants.
    Configuration { reason: String },
}

impl TokenError {
    /// Short machine-readable reason for diagnostics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::WrongKind { .. } => "wrong_kind",
            Self::Signing { .. } => "signing",
            Self::Configuration { .. } => "configuration",
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "token has expired"),
            Self::Malformed => write!(f, "token is malformed"),
            Self::BadSignature => write!(f, "token signature is invalid"),
            Self::WrongKind { expected, actual } => {
                write!(f, "expected {expected} token, got {actual} token")
            }
            Self::Signing { reason } => write!(f, "failed to sign token: {reason}"),
            Self::Configuration { reason } => {
                write!(f, "invalid token configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for TokenError {}

/// Errors that abort a federated login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederationError {
    /// The callback named a provider this system does not support.
    UnsupportedProvider { provider: String },
    /// The provider payload could not be turned into a canonical identity.
    MissingExternalId { provider: String },
    /// The account could not be looked up or created.
    AccountLookup(AccountError),
    /// Tokens could not be minted for the resolved account.
    TokenIssue(TokenError),
}

impl fmt::Display for FederationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProvider { provider } => {
                write!(f, "unsupported identity provider: {provider}")
            }
            Self::MissingExternalId { provider } => {
                write!(f, "{provider} user-info payload has no external id")
            }
            Self::AccountLookup(err) => write!(f, "account lookup failed: {err}"),
            Self::TokenIssue(err) => write!(f, "token issuance failed: {err}"),
        }
    }
}

impl std::error::Error for FederationError {}

impl From<IdentityError> for FederationError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnsupportedProvider { provider } => {
                Self::UnsupportedProvider { provider }
            }
            IdentityError::MissingExternalId { provider } => Self::MissingExternalId { provider },
        }
    }
}

impl From<AccountError> for FederationError {
    fn from(err: AccountError) -> Self {
        Self::AccountLookup(err)
    }
}

impl From<TokenError> for FederationError {
    fn from(err: TokenError) -> Self {
        Self::TokenIssue(err)
    }
}

/// Errors from authorization policy checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The path requires an authenticated context and none was established.
    NotAuthenticated { path: String },
    /// The caller is authenticated but not an administrator.
    AdminRequired { login_id: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated { path } => {
                write!(f, "authentication required for {path}")
            }
            Self::AdminRequired { login_id } => {
                write!(f, "account '{login_id}' is not an administrator")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_error_unsupported_provider_display() {
        let err = IdentityError::UnsupportedProvider {
            provider: "github".to_string(),
        };
        assert!(err.to_string().contains("unsupported"));
        assert!(err.to_string().contains("github"));
    }

    #[test]
    fn store_conflict_becomes_lookup_failure() {
        let err: AccountError = StoreError::AlreadyExists {
            login_id: "kakao_1".to_string(),
        }
        .into();
        assert_eq!(
            err,
            AccountError::LookupFailed {
                login_id: "kakao_1".to_string()
            }
        );
    }

    #[test]
    fn store_unavailable_keeps_details() {
        let err: AccountError = StoreError::Unavailable {
            details: "connection refused".to_string(),
        }
        .into();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn token_error_reasons() {
        assert_eq!(TokenError::Expired.reason(), "expired");
        assert_eq!(TokenError::Malformed.reason(), "malformed");
        assert_eq!(TokenError::BadSignature.reason(), "bad_signature");
        let wrong = TokenError::WrongKind {
            expected: TokenKind::Access,
            actual: TokenKind::Refresh,
        };
        assert_eq!(wrong.reason(), "wrong_kind");
        assert!(wrong.to_string().contains("expected access token"));
    }

    #[test]
    fn federation_error_wraps_identity_error() {
        let err: FederationError = IdentityError::UnsupportedProvider {
            provider: "line".to_string(),
        }
        .into();
        assert_eq!(
            err,
            FederationError::UnsupportedProvider {
                provider: "line".to_string()
            }
        );
    }

    #[test]
    fn authorization_error_display() {
        let err = AuthorizationError::NotAuthenticated {
            path: "/api/reservations".to_string(),
        };
        assert!(err.to_string().contains("/api/reservations"));
    }
}
