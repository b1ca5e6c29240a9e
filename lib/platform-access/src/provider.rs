//! Supported federation providers.
//!
//! Every provider-specific fact (registration id, OAuth2 endpoints, scopes,
//! user-info extraction) is keyed off this closed enum, so adding a provider
//! is a single variant whose missing match arms the compiler reports.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An external identity provider users can federate through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Kakao,
    Naver,
}

/// OAuth2 endpoints and scopes registered for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Where the browser is sent to authorize.
    pub authorization_url: &'static str,
    /// Where the authorization code is exchanged for a provider token.
    pub token_url: &'static str,
    /// Where the user-info payload is fetched with the provider token.
    pub user_info_url: &'static str,
    /// Scopes requested during authorization.
    pub scopes: &'static [&'static str],
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::Kakao, Provider::Naver];

    /// Registration id as it appears in paths and login ids.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Kakao => "kakao",
            Self::Naver => "naver",
        }
    }

    /// OAuth2 endpoints for this provider.
    #[must_use]
    pub fn endpoints(&self) -> ProviderEndpoints {
        match self {
            Self::Google => ProviderEndpoints {
                authorization_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                user_info_url: "https://openidconnect.googleapis.com/v1/userinfo",
                scopes: &["openid", "email", "profile"],
            },
            Self::Kakao => ProviderEndpoints {
                authorization_url: "https://kauth.kakao.com/oauth/authorize",
                token_url: "https://kauth.kakao.com/oauth/token",
                user_info_url: "https://kapi.kakao.com/v2/user/me",
                scopes: &["profile_nickname", "account_email"],
            },
            Self::Naver => ProviderEndpoints {
                authorization_url: "https://nid.naver.com/oauth2.0/authorize",
                token_url: "https://nid.naver.com/oauth2.0/token",
                user_info_url: "https://openapi.naver.com/v1/nid/me",
                scopes: &["name", "email"],
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "kakao" => Ok(Self::Kakao),
            "naver" => Ok(Self::Naver),
            other => Err(IdentityError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}
