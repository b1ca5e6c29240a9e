//! Access and refresh token issuance and verification.
//!
//! Tokens are HS256-signed JWTs. Nothing is stored server-side: a token
//! exists only through its signature and is valid until its `exp` claim.
//! Every token carries a `kind` claim so a refresh token is never accepted
//! where an access token is required, and vice versa.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::LoginId;
use crate::error::TokenError;
use crate::role::Role;

/// Minimum signing secret length for HS256.
const MIN_SECRET_BYTES: usize = 32;

/// Longest lifetime accepted for either token kind (366 days).
const MAX_TTL_SECONDS: i64 = 366 * 24 * 60 * 60;

/// Discriminates the two token families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer credential for API calls.
    Access,
    /// Long-lived credential used only to mint access tokens.
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// Token lifetimes and signing secret.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Clone, Deserialize)]
pub struct TokenConfig {
    /// HS256 signing secret; at least 32 bytes.
    secret: String,
    /// Access token lifetime in seconds. Default: one hour.
    #[serde(default = "default_access_ttl_seconds")]
    access_ttl_seconds: i64,
    /// Refresh token lifetime in seconds. Default: seven days.
    #[serde(default = "default_refresh_ttl_seconds")]
    refresh_ttl_seconds: i64,
}

fn default_access_ttl_seconds() -> i64 {
    60 * 60
}

fn default_refresh_ttl_seconds() -> i64 {
    7 * 24 * 60 * 60
}

impl TokenConfig {
    /// Creates a configuration with default lifetimes.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_seconds: default_access_ttl_seconds(),
            refresh_ttl_seconds: default_refresh_ttl_seconds(),
        }
    }

    /// Overrides both lifetimes.
    #[must_use]
    pub fn with_ttls(mut self, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        self.access_ttl_seconds = access_ttl_seconds;
        self.refresh_ttl_seconds = refresh_ttl_seconds;
        self
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

/// Signed claim set.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    kind: TokenKind,
    iat: i64,
    exp: i64,
}

/// A freshly signed token.
#[derive(Clone)]
pub struct IssuedToken {
    /// Compact JWT serialization.
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("kind", &self.kind)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Claims of a token whose signature, expiry, and kind have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub login_id: LoginId,
    /// Present on access tokens only.
    pub role: Option<Role>,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Stateless token issuer and verifier.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the secret is shorter than 32 bytes, the
    /// access lifetime is not positive, the access lifetime is not strictly
    /// shorter than the refresh lifetime, or the refresh lifetime exceeds 366 days.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        if config.secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::Configuration {
                reason: format!("signing secret must be at least {MIN_SECRET_BYTES} bytes"),
            });
        }
        if config.access_ttl_seconds <= 0 {
            return Err(TokenError::Configuration {
                reason: "access token lifetime must be positive".to_string(),
            });
        }
        if config.access_ttl_seconds >= config.refresh_ttl_seconds {
            return Err(TokenError::Configuration {
                reason: "access token lifetime must be shorter than refresh token lifetime"
                    .to_string(),
            });
        }
        if config.refresh_ttl_seconds > MAX_TTL_SECONDS {
            return Err(TokenError::Configuration {
                reason: format!(
                    "refresh token lifetime must not exceed {MAX_TTL_SECONDS} seconds"
                ),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: ttl(config.access_ttl_seconds)?,
            refresh_ttl: ttl(config.refresh_ttl_seconds)?,
        })
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issues an access token carrying the account's role.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the claim set cannot be signed.
    pub fn issue_access(&self, login_id: &LoginId, role: Role) -> Result<IssuedToken, TokenError> {
        self.issue_at(login_id, Some(role), TokenKind::Access, Utc::now())
    }

    /// Issues a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `Signing` if the claim set cannot be signed.
    pub fn issue_refresh(&self, login_id: &LoginId) -> Result<IssuedToken, TokenError> {
        self.issue_at(login_id, None, TokenKind::Refresh, Utc::now())
    }

    /// Verifies a token of either kind.
    ///
    /// # Errors
    ///
    /// Returns `BadSignature`, `Expired`, or `Malformed`. The signature is
    /// checked before any claim is read.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            },
        )?;
        let claims = data.claims;

        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        let issued_at = timestamp(claims.iat)?;
        let expires_at = timestamp(claims.exp)?;

        Ok(VerifiedToken {
            login_id: LoginId::from_stored(claims.sub),
            role: claims.role,
            kind: claims.kind,
            issued_at,
            expires_at,
        })
    }

    /// Verifies a token that must be an access token.
    ///
    /// # Errors
    ///
    /// Returns `WrongKind` for refresh tokens and `Malformed` for access
    /// tokens without a role, in addition to the [`verify`](Self::verify) errors.
    pub fn verify_access(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let verified = self.verify_kind(token, TokenKind::Access)?;
        if verified.role.is_none() {
            return Err(TokenError::Malformed);
        }
        Ok(verified)
    }

    /// Verifies a token that must be a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `WrongKind` for access tokens, in addition to the
    /// [`verify`](Self::verify) errors.
    pub fn verify_refresh(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_kind(token, TokenKind::Refresh)
    }

    fn verify_kind(&self, token: &str, expected: TokenKind) -> Result<VerifiedToken, TokenError> {
        let verified = self.verify(token)?;
        if verified.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: verified.kind,
            });
        }
        Ok(verified)
    }

    fn issue_at(
        &self,
        login_id: &LoginId,
        role: Option<Role>,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let lifetime = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or_else(|| TokenError::Signing {
                reason: "token expiry is out of range".to_string(),
            })?;
        let claims = Claims {
            sub: login_id.as_str().to_string(),
            role,
            kind,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |err| TokenError::Signing {
                reason: err.to_string(),
            },
        )?;

        Ok(IssuedToken {
            token,
            kind,
            expires_at,
        })
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

fn ttl(seconds: i64) -> Result<Duration, TokenError> {
    Duration::try_seconds(seconds).ok_or_else(|| TokenError::Configuration {
        reason: format!("token lifetime of {seconds} seconds is out of range"),
    })
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(TokenError::Malformed)
}
