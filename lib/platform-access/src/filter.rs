//! Per-request authentication and path policy.
//!
//! [`RequestAuthenticator`] runs before any handler. It never fails a
//! request itself: a missing or invalid bearer token simply leaves the
//! request anonymous. [`AccessPolicy`] then decides whether the path may be
//! served without an authenticated context.

use crate::auth::AuthenticatedUser;
use crate::error::{AuthorizationError, TokenError};
use crate::token::{TokenIssuer, VerifiedToken};
use std::sync::Arc;
use tracing::debug;

/// Path patterns reachable without authentication by default.
pub const DEFAULT_PUBLIC_PATHS: &[&str] =
    &["/oauth2/**", "/login/oauth2/**", "/api/auth/**", "/error"];

/// Verifies access tokens presented as bearer credentials.
pub trait AccessTokenVerifier: Send + Sync {
    /// Verifies `token` as an access token.
    ///
    /// # Errors
    ///
    /// Returns the internal reason the token was refused.
    fn verify_access(&self, token: &str) -> Result<VerifiedToken, TokenError>;
}

impl AccessTokenVerifier for TokenIssuer {
    fn verify_access(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        TokenIssuer::verify_access(self, token)
    }
}

/// Allow-list of paths that bypass authentication.
///
/// A pattern ending in `/**` matches the prefix itself and everything below
/// it; any other pattern matches exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPaths {
    patterns: Vec<String>,
}

impl PublicPaths {
    #[must_use]
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `path` is on the allow-list.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern.strip_suffix("/**") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => path == pattern.as_str(),
        })
    }
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_PATHS.iter().copied())
    }
}

/// Decides whether a request may proceed given its authentication context.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    public_paths: PublicPaths,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(public_paths: PublicPaths) -> Self {
        Self { public_paths }
    }

    #[must_use]
    pub fn public_paths(&self) -> &PublicPaths {
        &self.public_paths
    }

    /// Allows public paths, and any other path only with an authenticated caller.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` for a protected path without a caller.
    pub fn authorize(
        &self,
        path: &str,
        user: Option<&AuthenticatedUser>,
    ) -> Result<(), AuthorizationError> {
        if self.public_paths.is_public(path) || user.is_some() {
            Ok(())
        } else {
            Err(AuthorizationError::NotAuthenticated {
                path: path.to_string(),
            })
        }
    }
}

/// Establishes the caller of a request from its `Authorization` header.
#[derive(Clone)]
pub struct RequestAuthenticator {
    verifier: Arc<dyn AccessTokenVerifier>,
    policy: AccessPolicy,
}

impl RequestAuthenticator {
    #[must_use]
    pub fn new(verifier: Arc<dyn AccessTokenVerifier>, policy: AccessPolicy) -> Self {
        Self { verifier, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Returns the caller, or `None` for an anonymous request.
    ///
    /// Public paths are not inspected at all. Invalid tokens are logged with
    /// their reason and otherwise treated like a missing header.
    #[must_use]
    pub fn authenticate(
        &self,
        path: &str,
        authorization: Option<&str>,
    ) -> Option<AuthenticatedUser> {
        if self.policy.public_paths.is_public(path) {
            return None;
        }
        let token = authorization.and_then(bearer_token)?;

        match self
            .verifier
            .verify_access(token)
            .and_then(AuthenticatedUser::from_access_token)
        {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(path, reason = err.reason(), "ignoring invalid access token");
                None
            }
        }
    }

    /// Authenticates the request and applies the access policy.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when a protected path has no valid caller.
    pub fn check(
        &self,
        path: &str,
        authorization: Option<&str>,
    ) -> Result<Option<AuthenticatedUser>, AuthorizationError> {
        let user = self.authenticate(path, authorization);
        self.policy.authorize(path, user.as_ref())?;
        Ok(user)
    }
}

impl std::fmt::Debug for RequestAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthenticator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Extracts the credential of a `Bearer` authorization header.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
