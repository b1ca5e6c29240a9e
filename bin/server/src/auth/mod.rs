//! Authentication module for the hotelres server.
//!
//! This module provides:
//! - Provider login entry points and callbacks (OAuth2 authorization code)
//! - Refresh and logout endpoints for the refresh token cookie
//! - Bearer-token middleware and extractors for Axum routes
//! - The PostgreSQL account store
//!
//! # Authorization Model
//!
//! Every request passes through [`middleware::authenticate`]. Allow-listed
//! paths skip token verification; every other path needs a valid access
//! token or is answered with 401. Role checks beyond that (admin-only
//! routes) use the [`RequireAdmin`] extractor.

pub mod db;
pub mod middleware;
pub mod provider;
pub mod routes;

use crate::config::FederationConfig;
use hotelres_platform_access::{
    AccessPolicy, AccountLinker, AccountStore, FederationHandler, RequestAuthenticator,
    TokenIssuer,
};
use std::sync::Arc;

pub use middleware::{AuthRejection, RequireAdmin, RequireAuth};
pub use provider::{OAuthGateway, ProviderGateway};
pub use routes::AuthError;

/// Shared application state.
pub struct AppState {
    /// Account lookups under the store timeout.
    pub linker: AccountLinker,
    /// Token issuance and verification.
    pub tokens: Arc<TokenIssuer>,
    /// Completes federated logins.
    pub federation: FederationHandler,
    /// Establishes the caller of each request.
    pub authenticator: RequestAuthenticator,
    /// Identity provider access.
    pub gateway: Arc<dyn ProviderGateway>,
    /// Whether to set the Secure flag on cookies.
    pub secure_cookies: bool,
}

impl AppState {
    /// Wires the federation components around an account store.
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: Arc<TokenIssuer>,
        gateway: Arc<dyn ProviderGateway>,
        federation: &FederationConfig,
    ) -> Self {
        let linker = AccountLinker::new(store).with_store_timeout(federation.store_timeout());
        let handler = FederationHandler::new(linker.clone(), tokens.clone(), federation.settings());
        let authenticator = RequestAuthenticator::new(tokens.clone(), AccessPolicy::default());

        Self {
            linker,
            tokens,
            federation: handler,
            authenticator,
            gateway,
            secure_cookies: federation.secure_cookies,
        }
    }
}
