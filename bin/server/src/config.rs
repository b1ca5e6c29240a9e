//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `TOKEN__SECRET` or `PROVIDERS__KAKAO__CLIENT_ID`.
//!
//! See [`TokenConfig`](hotelres_platform_access::TokenConfig) for token
//! lifetimes and the signing secret.

use hotelres_platform_access::{FederationSettings, Provider, TokenConfig};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Socket address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Externally visible base URL of this server, used for provider redirect URIs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Token signing and lifetimes.
    pub token: TokenConfig,

    /// Federated login settings.
    #[serde(default)]
    pub federation: FederationConfig,

    /// Cross-origin access for the front end.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Registered provider clients.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Federated login configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Front-end page the browser lands on after login.
    #[serde(default = "default_frontend_redirect_url")]
    pub frontend_redirect_url: String,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Bound on each account store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

fn default_frontend_redirect_url() -> String {
    FederationSettings::default().frontend_redirect_url
}

fn default_secure_cookies() -> bool {
    true
}

fn default_store_timeout_ms() -> u64 {
    3000
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            frontend_redirect_url: default_frontend_redirect_url(),
            secure_cookies: default_secure_cookies(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl FederationConfig {
    /// Settings for the federation handler.
    #[must_use]
    pub fn settings(&self) -> FederationSettings {
        FederationSettings {
            frontend_redirect_url: self.frontend_redirect_url.clone(),
            secure_cookies: self.secure_cookies,
        }
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of origins allowed to make credentialed requests.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

fn default_allowed_origins() -> String {
    "http://localhost:5173,http://127.0.0.1:5173".to_string()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl CorsConfig {
    /// Returns the configured origins, trimmed, without empty entries.
    #[must_use]
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Client credentials registered with a provider.
#[derive(Clone, Deserialize)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Per-provider credentials; a provider without credentials is disabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: Option<ProviderCredentials>,
    #[serde(default)]
    pub kakao: Option<ProviderCredentials>,
    #[serde(default)]
    pub naver: Option<ProviderCredentials>,
}

impl ProvidersConfig {
    /// Returns the credentials for `provider`, if it is configured.
    #[must_use]
    pub fn credentials(&self, provider: Provider) -> Option<&ProviderCredentials> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Kakao => self.kakao.as_ref(),
            Provider::Naver => self.naver.as_ref(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Redirect URI registered with `provider` for the authorization-code callback.
    #[must_use]
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!(
            "{}/login/oauth2/code/{}",
            self.public_base_url.trim_end_matches('/'),
            provider.as_str()
        )
    }
}
