//! Request-scoped authentication context.
//!
//! - `AuthenticatedUser`: identity established from a verified access token
//! - `LoginInitiation`: redirect data for starting a provider login
//! - `CallbackData`: parameters a provider sends back to the callback

use crate::account::LoginId;
use crate::error::{AuthorizationError, TokenError};
use crate::role::Role;
use crate::token::{TokenKind, VerifiedToken};

/// The caller of a request, as established by a verified access token.
///
/// It lives only for the duration of one request; nothing about it is
/// stored server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    login_id: LoginId,
    role: Role,
}

impl AuthenticatedUser {
    /// Creates an authentication context.
    #[must_use]
    pub fn new(login_id: LoginId, role: Role) -> Self {
        Self { login_id, role }
    }

    /// Builds the context from verified access-token claims.
    ///
    /// # Errors
    ///
    /// Returns `WrongKind` for refresh tokens and `Malformed` when the
    /// token carries no role.
    pub fn from_access_token(token: VerifiedToken) -> Result<Self, TokenError> {
        if token.kind != TokenKind::Access {
            return Err(TokenError::WrongKind {
                expected: TokenKind::Access,
                actual: token.kind,
            });
        }
        let role = token.role.ok_or(TokenError::Malformed)?;
        Ok(Self::new(token.login_id, role))
    }

    #[must_use]
    pub fn login_id(&self) -> &LoginId {
        &self.login_id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns true if the caller has admin access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fails unless the caller is an administrator.
    ///
    /// # Errors
    ///
    /// Returns `AdminRequired` for non-admin callers.
    pub fn require_admin(&self) -> Result<(), AuthorizationError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthorizationError::AdminRequired {
                login_id: self.login_id.to_string(),
            })
        }
    }
}

/// Login initiation data for redirecting to a provider.
#[derive(Debug, Clone)]
pub struct LoginInitiation {
    /// The URL to redirect the user to for authentication.
    pub authorization_url: String,
    /// State parameter for CSRF protection (store in a cookie).
    pub state: String,
}

/// Data needed to process a provider callback.
#[derive(Debug, Clone)]
pub struct CallbackData {
    /// The authorization code from the provider.
    pub code: String,
    /// The state parameter (must match the one from login initiation).
    pub state: String,
}
