//! OAuth2 authorization code flow against the configured providers

use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, ExtraTokenFields,
    RedirectUrl, RequestTokenError, Scope, StandardRevocableToken, StandardTokenResponse,
    TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::providers::{ProviderId, ProviderSettings};

/// Provider-specific fields of a token response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderTokenFields {
    /// Salesforce org endpoint that API calls must target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

impl ExtraTokenFields for ProviderTokenFields {}

pub type ProviderTokenResponse = StandardTokenResponse<ProviderTokenFields, BasicTokenType>;

type ProviderClient = oauth2::Client<
    BasicErrorResponse,
    ProviderTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid {field} for provider {provider}: {reason}")]
    InvalidConfiguration {
        provider: ProviderId,
        field: &'static str,
        reason: String,
    },

    /// The token endpoint answered with an OAuth error body
    #[error("token endpoint rejected the code: {0}")]
    Rejected(String),

    /// Transport failure or an unparseable token response
    #[error("token exchange failed: {0}")]
    Exchange(String),
}

/// Tokens obtained from a successful code exchange
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime stated by the provider, in seconds
    pub expires_in: Option<u64>,
    pub instance_url: Option<String>,
}

/// OAuth2 client wrapper for one provider
#[derive(Clone)]
pub struct OAuthClient {
    client: ProviderClient,
    settings: ProviderSettings,
}

impl OAuthClient {
    /// Create a client from a provider table entry
    pub fn new(settings: ProviderSettings) -> Result<Self, OAuthError> {
        let invalid = |field: &'static str, e: oauth2::url::ParseError| {
            OAuthError::InvalidConfiguration {
                provider: settings.id,
                field,
                reason: e.to_string(),
            }
        };

        let client = ProviderClient::new(
            ClientId::new(settings.client_id.clone()),
            Some(ClientSecret::new(settings.client_secret.clone())),
            AuthUrl::new(settings.auth_url.clone()).map_err(|e| invalid("auth_url", e))?,
            Some(TokenUrl::new(settings.token_url.clone()).map_err(|e| invalid("token_url", e))?),
        )
        .set_redirect_uri(
            RedirectUrl::new(settings.redirect_uri.clone()).map_err(|e| invalid("redirect_uri", e))?,
        )
        .set_auth_type(AuthType::RequestBody);

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn provider(&self) -> ProviderId {
        self.settings.id
    }

    /// Build the provider authorization URL carrying `state`
    pub fn authorize_url(&self, state: &str) -> String {
        let mut request = self
            .client
            .authorize_url(|| CsrfToken::new(state.to_string()));

        for scope in &self.settings.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        for (name, value) in &self.settings.extra_params {
            request = request.add_extra_param(name.clone(), value.clone());
        }

        let (url, _) = request.url();
        url.to_string()
    }

    /// Exchange an authorization code for tokens; a single attempt
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthError> {
        info!(
            "Exchanging authorization code for access token for {}",
            self.settings.id
        );

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(body) => OAuthError::Rejected(body.to_string()),
                other => OAuthError::Exchange(other.to_string()),
            })?;

        Ok(TokenGrant {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|token| token.secret().clone()),
            expires_in: response.expires_in().map(|lifetime| lifetime.as_secs()),
            instance_url: response.extra_fields().instance_url.clone(),
        })
    }
}
