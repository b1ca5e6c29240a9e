//! OAuth2 authorization-code flow against the supported providers.
//!
//! - `GET /oauth2/authorization/{provider}` uses [`ProviderGateway::begin_login`]
//! - `GET /login/oauth2/code/{provider}` uses [`ProviderGateway::fetch_user_info`]
//!
//! The gateway ends where the user-info JSON is in hand; turning that into
//! an account and tokens belongs to the federation handler.

use async_trait::async_trait;
use hotelres_platform_access::{CallbackData, LoginInitiation, Provider, ProviderEndpoints};
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, basic::BasicClient};
use rootcause::prelude::Report;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::config::ServerConfig;
use crate::error::ProviderError;

/// Access to the identity providers.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Returns true if client credentials exist for `provider`.
    fn is_configured(&self, provider: Provider) -> bool;

    /// Builds the authorization redirect and its CSRF state.
    fn begin_login(&self, provider: Provider) -> Result<LoginInitiation, Report<ProviderError>>;

    /// Exchanges the callback's code and fetches the raw user-info payload.
    async fn fetch_user_info(
        &self,
        provider: Provider,
        callback: &CallbackData,
    ) -> Result<JsonValue, Report<ProviderError>>;
}

/// Registered client for one provider.
struct ProviderClient {
    client_id: ClientId,
    client_secret: String,
    auth_url: AuthUrl,
    redirect_url: RedirectUrl,
    endpoints: ProviderEndpoints,
}

/// Subset of the token endpoint reply that is needed.
///
/// Naver sends `expires_in` as a string, so only `access_token` is read.
#[derive(Deserialize)]
struct TokenReply {
    access_token: String,
}

/// [`ProviderGateway`] backed by the providers' HTTP endpoints.
pub struct OAuthGateway {
    clients: HashMap<Provider, ProviderClient>,
    http: reqwest::Client,
}

impl OAuthGateway {
    /// Creates a gateway for every provider with configured credentials.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if an endpoint or redirect URI is not a valid URL.
    pub fn new(config: &ServerConfig) -> Result<Self, Report<ProviderError>> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProviderError::Configuration {
                details: format!("HTTP client error: {e}"),
            })?;

        let mut clients = HashMap::new();
        for provider in Provider::ALL {
            let Some(credentials) = config.providers.credentials(provider) else {
                continue;
            };
            let endpoints = provider.endpoints();
            let auth_url = AuthUrl::new(endpoints.authorization_url.to_string()).map_err(|e| {
                ProviderError::Configuration {
                    details: format!("invalid {provider} authorization URL: {e}"),
                }
            })?;
            let redirect_url = RedirectUrl::new(config.redirect_uri(provider)).map_err(|e| {
                ProviderError::Configuration {
                    details: format!("invalid {provider} redirect URI: {e}"),
                }
            })?;

            clients.insert(
                provider,
                ProviderClient {
                    client_id: ClientId::new(credentials.client_id.clone()),
                    client_secret: credentials.client_secret.clone(),
                    auth_url,
                    redirect_url,
                    endpoints,
                },
            );
        }

        Ok(Self { clients, http })
    }

    fn client(&self, provider: Provider) -> Result<&ProviderClient, Report<ProviderError>> {
        self.clients.get(&provider).ok_or_else(|| {
            ProviderError::NotConfigured {
                provider: provider.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ProviderGateway for OAuthGateway {
    fn is_configured(&self, provider: Provider) -> bool {
        self.clients.contains_key(&provider)
    }

    fn begin_login(&self, provider: Provider) -> Result<LoginInitiation, Report<ProviderError>> {
        let registered = self.client(provider)?;

        let client = BasicClient::new(registered.client_id.clone())
            .set_auth_uri(registered.auth_url.clone())
            .set_redirect_uri(registered.redirect_url.clone());

        let mut auth_request = client.authorize_url(CsrfToken::new_random);
        for scope in registered.endpoints.scopes {
            auth_request = auth_request.add_scope(Scope::new((*scope).to_string()));
        }
        let (auth_url, csrf_token) = auth_request.url();

        Ok(LoginInitiation {
            authorization_url: auth_url.to_string(),
            state: csrf_token.secret().clone(),
        })
    }

    #[instrument(skip(self, callback), fields(provider = %provider))]
    async fn fetch_user_info(
        &self,
        provider: Provider,
        callback: &CallbackData,
    ) -> Result<JsonValue, Report<ProviderError>> {
        let registered = self.client(provider)?;

        let token: TokenReply = self
            .http
            .post(registered.endpoints.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", callback.code.as_str()),
                ("state", callback.state.as_str()),
                ("redirect_uri", registered.redirect_url.as_str()),
                ("client_id", registered.client_id.as_str()),
                ("client_secret", registered.client_secret.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProviderError::TokenExchange {
                provider: provider.to_string(),
                details: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| ProviderError::TokenExchange {
                provider: provider.to_string(),
                details: format!("unexpected token response: {e}"),
            })?;

        let user_info: JsonValue = self
            .http
            .get(registered.endpoints.user_info_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProviderError::UserInfo {
                provider: provider.to_string(),
                details: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| ProviderError::UserInfo {
                provider: provider.to_string(),
                details: format!("user-info is not JSON: {e}"),
            })?;

        debug!("fetched provider user-info");
        Ok(user_info)
    }
}
