//! Identity federation and session tokens for hotelres.
//!
//! This crate provides:
//! - Provider payload normalization (`normalize`, `CanonicalIdentity`)
//! - Just-in-time account provisioning (`AccountLinker`, `AccountStore`)
//! - Stateless access/refresh tokens (`TokenIssuer`)
//! - Federated login completion (`FederationHandler`)
//! - Per-request authentication (`RequestAuthenticator`, `AccessPolicy`)
//!
//! # Access Model
//!
//! A federated account's login id is its canonical identity encoded as
//! `<provider>_<externalId>`. Access tokens carry the login id and role and
//! are re-verified on every request; nothing is kept server-side.
//!
//! # Example
//!
//! ```
//! use hotelres_platform_access::{
//!     AccessPolicy, LoginId, RequestAuthenticator, Role, TokenConfig, TokenIssuer,
//! };
//! use std::sync::Arc;
//!
//! let issuer = Arc::new(
//!     TokenIssuer::new(&TokenConfig::new("an-example-signing-secret-of-32-bytes")).unwrap(),
//! );
//! let login_id = LoginId::from_stored("kakao_555".to_string());
//! let access = issuer.issue_access(&login_id, Role::User).unwrap();
//!
//! let authenticator = RequestAuthenticator::new(issuer, AccessPolicy::default());
//! let header = format!("Bearer {}", access.token);
//! let user = authenticator.authenticate("/api/me", Some(&header)).unwrap();
//!
//! assert_eq!(user.login_id(), &login_id);
//! assert!(!user.is_admin());
//! ```

pub mod account;
pub mod auth;
pub mod error;
pub mod federation;
pub mod filter;
pub mod identity;
pub mod linker;
pub mod provider;
pub mod role;
pub mod store;
pub mod token;

// Re-export main types at crate root
pub use account::{Account, AccountStatus, FEDERATED_PASSWORD_SENTINEL, InvalidLoginId, LoginId};
pub use auth::{AuthenticatedUser, CallbackData, LoginInitiation};
pub use error::{
    AccountError, AuthorizationError, FederationError, IdentityError, StoreError, TokenError,
};
pub use federation::{FederationHandler, FederationResponse, FederationSettings, RefreshCookie};
pub use filter::{AccessPolicy, AccessTokenVerifier, PublicPaths, RequestAuthenticator};
pub use identity::{
    CanonicalIdentity, NormalizedIdentity, PLACEHOLDER_EMAIL_DOMAIN, is_placeholder_email,
    normalize, normalize_named,
};
pub use linker::AccountLinker;
pub use provider::{Provider, ProviderEndpoints};
pub use role::Role;
pub use store::{AccountStore, InMemoryAccountStore};
pub use token::{IssuedToken, TokenConfig, TokenIssuer, TokenKind, VerifiedToken};
