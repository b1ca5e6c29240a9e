//! Domain error types for server operations.
//!
//! Provider gateway calls return `Report<ProviderError>`; startup wiring
//! returns [`StartupError`].

use std::fmt;

/// Errors talking to an identity provider.
#[derive(Debug)]
pub enum ProviderError {
    /// No client credentials are configured for the provider.
    NotConfigured { provider: String },
    /// A configured endpoint or redirect URI is invalid.
    Configuration { details: String },
    /// Exchanging the authorization code failed.
    TokenExchange { provider: String, details: String },
    /// Fetching the user-info payload failed.
    UserInfo { provider: String, details: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { provider } => {
                write!(f, "provider '{provider}' is not configured")
            }
            Self::Configuration { details } => {
                write!(f, "invalid provider configuration: {details}")
            }
            Self::TokenExchange { provider, details } => {
                write!(f, "{provider} code exchange failed: {details}")
            }
            Self::UserInfo { provider, details } => {
                write!(f, "{provider} user-info request failed: {details}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors assembling the application at startup.
#[derive(Debug)]
pub enum StartupError {
    /// A wildcard origin was configured alongside credentialed CORS.
    WildcardCorsOrigin,
    /// An origin is not a valid header value.
    InvalidCorsOrigin { origin: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WildcardCorsOrigin => {
                write!(f, "wildcard CORS origin cannot be used with credentials")
            }
            Self::InvalidCorsOrigin { origin } => {
                write!(f, "invalid CORS origin '{origin}'")
            }
        }
    }
}

impl std::error::Error for StartupError {}
