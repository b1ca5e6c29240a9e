//! Federated login completion.
//!
//! [`FederationHandler::on_provider_success`] runs once a provider has
//! authenticated the user and returned its user-info payload:
//!
//! ```text
//! payload ─► normalize ─► link or create account ─► issue tokens ─► response
//! ```
//!
//! Any stage failing short-circuits; tokens are minted only after the
//! account is resolved. The result is plain data that the HTTP layer turns
//! into a 302 redirect and a `Set-Cookie` header.

use crate::account::LoginId;
use crate::error::FederationError;
use crate::identity::normalize_named;
use crate::linker::AccountLinker;
use crate::token::TokenIssuer;
use hotelres_core::Result;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Transport-independent description of the refresh token cookie.
///
/// The HTTP layer always writes it with `SameSite=Lax`.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshCookie {
    pub name: &'static str,
    pub value: String,
    pub path: &'static str,
    /// Equal to the refresh token lifetime; zero clears the cookie.
    pub max_age_seconds: i64,
    pub http_only: bool,
    pub secure: bool,
}

impl RefreshCookie {
    /// Cookie carrying a refresh token.
    #[must_use]
    pub fn issued(value: String, max_age_seconds: i64, secure: bool) -> Self {
        Self {
            name: REFRESH_COOKIE_NAME,
            value,
            path: REFRESH_COOKIE_PATH,
            max_age_seconds,
            http_only: true,
            secure,
        }
    }

    /// Cookie that removes a previously issued refresh token.
    #[must_use]
    pub fn cleared(secure: bool) -> Self {
        Self::issued(String::new(), 0, secure)
    }
}

impl fmt::Debug for RefreshCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCookie")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("max_age_seconds", &self.max_age_seconds)
            .field("http_only", &self.http_only)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful federated login.
#[derive(Clone)]
pub struct FederationResponse {
    /// Front-end URL with the access token in the fragment.
    pub redirect_target: String,
    pub refresh_cookie: RefreshCookie,
    /// Account the tokens were issued to.
    pub login_id: LoginId,
}

impl fmt::Debug for FederationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederationResponse")
            .field("login_id", &self.login_id)
            .field("refresh_cookie", &self.refresh_cookie)
            .finish_non_exhaustive()
    }
}

/// Where a completed login lands and how cookies are marked.
#[derive(Debug, Clone)]
pub struct FederationSettings {
    /// Front-end page that picks the access token out of the fragment.
    pub frontend_redirect_url: String,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            frontend_redirect_url: "http://localhost:5173/main".to_string(),
            secure_cookies: true,
        }
    }
}

/// Orchestrates normalization, account linking, and token issuance.
#[derive(Debug, Clone)]
pub struct FederationHandler {
    linker: AccountLinker,
    tokens: Arc<TokenIssuer>,
    settings: FederationSettings,
}

impl FederationHandler {
    #[must_use]
    pub fn new(
        linker: AccountLinker,
        tokens: Arc<TokenIssuer>,
        settings: FederationSettings,
    ) -> Self {
        Self {
            linker,
            tokens,
            settings,
        }
    }

    /// Completes a federated login for `provider` with its user-info payload.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` or `MissingExternalId` before any
    /// account is touched, `AccountLookup` when the store fails, and
    /// `TokenIssue` if signing fails.
    #[instrument(skip(self, raw))]
    pub async fn on_provider_success(
        &self,
        provider: &str,
        raw: &JsonValue,
    ) -> Result<FederationResponse, FederationError> {
        let normalized = normalize_named(provider, raw).map_err(FederationError::from)?;

        let account = self
            .linker
            .link_or_create(
                &normalized.identity,
                &normalized.display_name,
                &normalized.email,
            )
            .await
            .map_err(FederationError::from)?;

        let access = self
            .tokens
            .issue_access(account.login_id(), account.role())
            .map_err(FederationError::from)?;
        let refresh = self
            .tokens
            .issue_refresh(account.login_id())
            .map_err(FederationError::from)?;

        info!(login_id = %account.login_id(), "federated login completed");

        Ok(FederationResponse {
            redirect_target: format!(
                "{}#token={}",
                self.settings.frontend_redirect_url, access.token
            ),
            refresh_cookie: RefreshCookie::issued(
                refresh.token,
                self.tokens.refresh_ttl().num_seconds(),
                self.settings.secure_cookies,
            ),
            login_id: account.login_id().clone(),
        })
    }
}
