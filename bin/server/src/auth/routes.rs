//! Authentication routes for provider login, callback, refresh, and logout.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hotelres_platform_access::federation::REFRESH_COOKIE_NAME;
use hotelres_platform_access::{Account, CallbackData, Provider, RefreshCookie, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{debug, error, info, warn};

use super::{AppState, RequireAdmin, RequireAuth};

/// Cookie holding the CSRF state between login initiation and callback.
const AUTH_STATE_COOKIE: &str = "oauth2_state";

/// Path the auth state cookie is scoped to.
const AUTH_STATE_COOKIE_PATH: &str = "/login/oauth2";

/// Where failed logins are sent.
const ERROR_PATH: &str = "/error";

/// Query parameters for the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    /// Set by the provider when the user declined or the request was invalid.
    error: Option<String>,
}

/// Body of a successful refresh.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

/// The caller's own account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub login_id: String,
    pub role: Role,
    pub display_name: String,
    pub email: String,
    /// True when the email was synthesized and must not be mailed.
    pub placeholder_email: bool,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            login_id: account.login_id().to_string(),
            role: account.role(),
            display_name: account.display_name().to_string(),
            email: account.email().to_string(),
            placeholder_email: account.has_placeholder_email(),
        }
    }
}

/// Redirects the browser to the provider's authorization endpoint.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let provider = enabled_provider(&state, &provider)?;
    let login = state
        .gateway
        .begin_login(provider)
        .map_err(|e| AuthError::Provider(e.to_string()))?;

    // Store the state in a cookie for validation on callback
    let cookie = Cookie::build((AUTH_STATE_COOKIE, login.state))
        .path(AUTH_STATE_COOKIE_PATH)
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(10));

    Ok((jar.add(cookie), found(&login.authorization_url)))
}

/// Completes a provider login: 302 to the front end with the access token
/// in the fragment and the refresh token in a cookie.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let provider = enabled_provider(&state, &provider)?;

    if let Some(reason) = query.error {
        return Err(AuthError::ProviderDenied(reason));
    }

    let expected_state = jar
        .get(AUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::MissingAuthState)?;
    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Err(AuthError::InvalidCallback);
    };
    if returned_state != expected_state {
        return Err(AuthError::CsrfMismatch);
    }

    let raw = state
        .gateway
        .fetch_user_info(
            provider,
            &CallbackData {
                code,
                state: returned_state,
            },
        )
        .await
        .map_err(|e| AuthError::Provider(e.to_string()))?;

    let response = state
        .federation
        .on_provider_success(provider.as_str(), &raw)
        .await
        .map_err(|e| AuthError::LoginFailed(e.to_string()))?;

    let jar = jar
        .add(refresh_cookie(response.refresh_cookie))
        .add(cleared_state_cookie());

    Ok((jar, found(&response.redirect_target)))
}

/// Mints a new access token from the refresh token cookie.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<AccessTokenResponse>, AuthError> {
    let cookie = jar
        .get(REFRESH_COOKIE_NAME)
        .ok_or(AuthError::InvalidRefreshToken)?;

    let verified = state.tokens.verify_refresh(cookie.value()).map_err(|e| {
        debug!(reason = e.reason(), "refresh token rejected");
        AuthError::InvalidRefreshToken
    })?;

    let account = state
        .linker
        .find(&verified.login_id)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .filter(Account::is_active)
        .ok_or(AuthError::InvalidRefreshToken)?;

    let access = state
        .tokens
        .issue_access(account.login_id(), account.role())
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    Ok(Json(AccessTokenResponse {
        access_token: access.token,
        token_type: "Bearer",
        expires_in: state.tokens.access_ttl().num_seconds(),
    }))
}

/// Clears the refresh token cookie.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let cleared = refresh_cookie(RefreshCookie::cleared(state.secure_cookies));
    (jar.add(cleared), StatusCode::NO_CONTENT)
}

/// Returns the caller's account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AccountResponse>, AuthError> {
    let account = state
        .linker
        .find(user.login_id())
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::AccountUnavailable)?;

    Ok(Json(AccountResponse::from(&account)))
}

/// Succeeds only for administrators.
pub async fn admin_check(RequireAdmin(admin): RequireAdmin) -> StatusCode {
    debug!(login_id = %admin.login_id(), "admin check passed");
    StatusCode::NO_CONTENT
}

/// Landing page for failed logins.
pub async fn error_page() -> impl IntoResponse {
    (StatusCode::OK, "Authentication failed")
}

fn enabled_provider(state: &AppState, name: &str) -> Result<Provider, AuthError> {
    let provider: Provider = name
        .parse()
        .map_err(|_| AuthError::UnknownProvider(name.to_string()))?;
    if !state.gateway.is_configured(provider) {
        return Err(AuthError::UnknownProvider(name.to_string()));
    }
    Ok(provider)
}

/// Converts the refresh cookie description into a `Set-Cookie` value.
fn refresh_cookie(cookie: RefreshCookie) -> Cookie<'static> {
    Cookie::build((cookie.name, cookie.value))
        .path(cookie.path)
        .http_only(cookie.http_only)
        .secure(cookie.secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(cookie.max_age_seconds))
        .build()
}

/// Expires the auth state cookie; a callback consumes it whatever the outcome.
fn cleared_state_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_STATE_COOKIE, ""))
        .path(AUTH_STATE_COOKIE_PATH)
        .max_age(TimeDuration::ZERO)
        .build()
}

/// 302 Found; axum's `Redirect::to` answers 303.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Authentication errors.
#[derive(Debug)]
pub enum AuthError {
    UnknownProvider(String),
    MissingAuthState,
    InvalidCallback,
    CsrfMismatch,
    ProviderDenied(String),
    Provider(String),
    LoginFailed(String),
    InvalidRefreshToken,
    AccountUnavailable,
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::UnknownProvider(name) => {
                debug!(provider = %name, "login requested for unknown provider");
                (StatusCode::NOT_FOUND, "Unknown provider").into_response()
            }
            Self::MissingAuthState => rejected_callback("missing auth state"),
            Self::InvalidCallback => rejected_callback("missing code or state"),
            Self::CsrfMismatch => rejected_callback("state mismatch"),
            Self::ProviderDenied(reason) => {
                info!(reason = %reason, "provider denied login");
                failed_login()
            }
            Self::Provider(msg) => {
                error!("Provider request failed: {}", msg);
                failed_login()
            }
            Self::LoginFailed(msg) => {
                error!("Federated login failed: {}", msg);
                failed_login()
            }
            Self::InvalidRefreshToken | Self::AccountUnavailable => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            Self::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

fn rejected_callback(reason: &str) -> Response {
    warn!(reason, "rejected provider callback");
    failed_login()
}

/// Sends the browser to the error page and drops the spent auth state.
fn failed_login() -> Response {
    let jar = CookieJar::new().add(cleared_state_cookie());
    (jar, found(ERROR_PATH)).into_response()
}
