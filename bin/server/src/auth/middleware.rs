//! Authentication middleware and extractors for Axum.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hotelres_platform_access::AuthenticatedUser;
use std::sync::Arc;
use tracing::debug;

use super::AppState;

/// Authenticates every request from its bearer token and applies the path policy.
///
/// On success the caller, if any, is stored as a request extension for the
/// extractors below. Protected paths without a caller get 401, never a redirect.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.authenticator.check(&path, authorization) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(err) => {
            debug!(error = %err, "rejecting unauthenticated request");
            AuthRejection::NotAuthenticated.into_response()
        }
    }
}

/// Extractor for requiring an authenticated user.
///
/// If the user is not authenticated, the request is rejected with 401.
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

/// Extractor for requiring an authenticated admin user.
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        if user.require_admin().is_err() {
            return Err(AuthRejection::AdminRequired);
        }

        Ok(RequireAdmin(user))
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
    AdminRequired,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            Self::AdminRequired => (StatusCode::FORBIDDEN, "Admin access required").into_response(),
        }
    }
}
