//! Normalization of provider user-info payloads.
//!
//! Each provider returns a differently shaped JSON document. [`normalize`]
//! reduces it to a [`NormalizedIdentity`]: the canonical `(provider,
//! external id)` pair plus a display name and email that are always
//! present, synthesized deterministically when the provider withholds them.

use crate::account::LoginId;
use crate::error::IdentityError;
use crate::provider::Provider;
use serde_json::Value as JsonValue;

/// Domain used for synthesized email addresses.
///
/// `.invalid` is reserved (RFC 2606) so these addresses can never be delivered.
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "placeholder.invalid";

/// Returns true if the address was synthesized rather than supplied by a provider.
#[must_use]
pub fn is_placeholder_email(email: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain == PLACEHOLDER_EMAIL_DOMAIN)
}

/// The join key between a federated identity and a local account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalIdentity {
    provider: Provider,
    external_id: String,
}

impl CanonicalIdentity {
    /// Creates a canonical identity.
    #[must_use]
    pub fn new(provider: Provider, external_id: impl Into<String>) -> Self {
        Self {
            provider,
            external_id: external_id.into(),
        }
    }

    /// Returns the provider.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the provider-assigned identifier.
    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Encodes the identity as `<provider>_<externalId>`.
    #[must_use]
    pub fn login_id(&self) -> LoginId {
        LoginId::federated(self)
    }
}

/// A provider payload reduced to the fields account linking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    /// Canonical identity.
    pub identity: CanonicalIdentity,
    /// Provider display name, or `"<PROVIDER> user"`.
    pub display_name: String,
    /// Provider email, or a placeholder under [`PLACEHOLDER_EMAIL_DOMAIN`].
    pub email: String,
}

/// Normalizes a payload for a provider given by registration id.
///
/// # Errors
///
/// Returns `UnsupportedProvider` for names outside the supported set, and
/// `MissingExternalId` when the payload carries no identifier.
pub fn normalize_named(
    provider: &str,
    raw: &JsonValue,
) -> Result<NormalizedIdentity, IdentityError> {
    let provider: Provider = provider.parse()?;
    normalize(provider, raw)
}

/// Normalizes a provider user-info payload.
///
/// # Errors
///
/// Returns `MissingExternalId` when the payload carries no identifier.
pub fn normalize(provider: Provider, raw: &JsonValue) -> Result<NormalizedIdentity, IdentityError> {
    let (external_id, name, email) = match provider {
        Provider::Google => (
            raw.get("sub").and_then(identifier),
            raw.get("name").and_then(JsonValue::as_str),
            raw.get("email").and_then(JsonValue::as_str),
        ),
        Provider::Kakao => {
            // kakao_account and its profile are omitted when the user
            // declined consent; email is also withheld until verified.
            let account = raw.get("kakao_account");
            (
                raw.get("id").and_then(identifier),
                account
                    .and_then(|a| a.get("profile"))
                    .and_then(|p| p.get("nickname"))
                    .and_then(JsonValue::as_str),
                account
                    .and_then(|a| a.get("email"))
                    .and_then(JsonValue::as_str),
            )
        }
        Provider::Naver => {
            let response = raw.get("response");
            (
                response.and_then(|r| r.get("id")).and_then(identifier),
                response
                    .and_then(|r| r.get("name"))
                    .and_then(JsonValue::as_str),
                response
                    .and_then(|r| r.get("email"))
                    .and_then(JsonValue::as_str),
            )
        }
    };

    let external_id = external_id.ok_or_else(|| IdentityError::MissingExternalId {
        provider: provider.to_string(),
    })?;
    let identity = CanonicalIdentity::new(provider, external_id);

    let display_name = match name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => format!("{} user", provider.as_str().to_uppercase()),
    };
    let email = match email {
        Some(email) if !email.trim().is_empty() => email.to_string(),
        _ => format!(
            "{}_{}@{PLACEHOLDER_EMAIL_DOMAIN}",
            provider.as_str(),
            identity.external_id()
        ),
    };

    Ok(NormalizedIdentity {
        identity,
        display_name,
        email,
    })
}

/// Reads an identifier that providers send either as a string or a number.
fn identifier(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
