//! Provider table for the supported integrations
//!
//! Every provider differs only by data: endpoints, scopes, cookie names and
//! whether tokens are forwarded to the automation webhook. The authorize and
//! callback routes are written once against [`ProviderSettings`].

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::config::{ConfigError, optional, required};

/// Lifetime of refresh-token cookies and persisted refresh tokens (30 days)
pub const REFRESH_TOKEN_TTL: u64 = 60 * 60 * 24 * 30;

/// Access-token lifetime used when the provider does not state one (1 hour)
pub const DEFAULT_ACCESS_TOKEN_TTL: u64 = 60 * 60;

/// Supported integration providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "google-drive")]
    GoogleDrive,
    #[serde(rename = "salesforce")]
    Salesforce,
    #[serde(rename = "hubspot")]
    HubSpot,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [
        ProviderId::GoogleDrive,
        ProviderId::Salesforce,
        ProviderId::HubSpot,
    ];

    /// Identifier used in routes and redirect query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::GoogleDrive => "google-drive",
            ProviderId::Salesforce => "salesforce",
            ProviderId::HubSpot => "hubspot",
        }
    }

    /// Prefix of the token cookie names (`google_access_token`, ...)
    pub fn cookie_prefix(&self) -> &'static str {
        match self {
            ProviderId::GoogleDrive => "google",
            ProviderId::Salesforce => "salesforce",
            ProviderId::HubSpot => "hubspot",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            ProviderId::GoogleDrive => "GOOGLE",
            ProviderId::Salesforce => "SALESFORCE",
            ProviderId::HubSpot => "HUBSPOT",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a route names a provider that does not exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// Everything needed to run the authorization code flow against one provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub id: ProviderId,
    pub client_id: String,
    pub client_secret: String,
    /// Must match the URI registered with the provider byte for byte
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    /// Additional authorization query parameters
    pub extra_params: Vec<(String, String)>,
    /// Access cookie lifetime when the token response has no `expires_in`
    pub default_access_ttl: u64,
    /// Whether the callback forwards tokens to the automation webhook
    pub forward_tokens: bool,
}

impl ProviderSettings {
    /// Built-in endpoints and scopes for a provider, with empty credentials
    pub fn defaults(id: ProviderId, app_url: &str) -> Self {
        let redirect_uri = format!("{}/api/oauth/callback/{}", app_url, id.as_str());

        let (auth_url, token_url, scopes, extra_params, forward_tokens) = match id {
            ProviderId::GoogleDrive => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                vec![
                    "https://www.googleapis.com/auth/drive.readonly",
                    "https://www.googleapis.com/auth/userinfo.profile",
                    "https://www.googleapis.com/auth/userinfo.email",
                ],
                vec![("access_type", "offline"), ("prompt", "consent")],
                false,
            ),
            ProviderId::Salesforce => (
                "https://login.salesforce.com/services/oauth2/authorize",
                "https://login.salesforce.com/services/oauth2/token",
                vec!["api", "refresh_token"],
                vec![],
                true,
            ),
            ProviderId::HubSpot => (
                "https://app.hubspot.com/oauth/authorize",
                "https://api.hubapi.com/oauth/v1/token",
                vec![
                    "oauth",
                    "crm.objects.contacts.read",
                    "crm.objects.deals.read",
                    "crm.objects.owners.read",
                    "crm.schemas.deals.read",
                ],
                vec![],
                true,
            ),
        };

        ProviderSettings {
            id,
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri,
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            scopes: scopes.into_iter().map(str::to_string).collect(),
            extra_params: extra_params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            forward_tokens,
        }
    }

    /// Load a provider from `<P>_*` variables; `None` when `<P>_CLIENT_ID` is unset
    ///
    /// # Environment Variables
    /// - `<P>_CLIENT_ID`, `<P>_CLIENT_SECRET`: OAuth client credentials
    /// - `<P>_REDIRECT_URI`: callback URI (default: `<APP_URL>/api/oauth/callback/<id>`)
    /// - `<P>_AUTH_URL`, `<P>_TOKEN_URL`: endpoint overrides
    /// - `<P>_FORWARD_TOKENS`: "true"/"false" override for webhook forwarding
    ///
    /// where `<P>` is `GOOGLE`, `SALESFORCE` or `HUBSPOT`.
    pub fn from_env(id: ProviderId, app_url: &str) -> Result<Option<Self>, ConfigError> {
        let prefix = id.env_prefix();
        let var = |suffix: &str| format!("{}_{}", prefix, suffix);

        let Some(client_id) = optional(&var("CLIENT_ID")) else {
            return Ok(None);
        };

        let mut settings = Self::defaults(id, app_url);
        settings.client_id = client_id;
        settings.client_secret = required(&var("CLIENT_SECRET"))?;

        if let Some(redirect_uri) = optional(&var("REDIRECT_URI")) {
            settings.redirect_uri = redirect_uri;
        }
        if let Some(auth_url) = optional(&var("AUTH_URL")) {
            settings.auth_url = auth_url;
        }
        if let Some(token_url) = optional(&var("TOKEN_URL")) {
            settings.token_url = token_url;
        }
        if let Some(forward) = optional(&var("FORWARD_TOKENS")) {
            let key = var("FORWARD_TOKENS");
            settings.forward_tokens = forward
                .parse()
                .map_err(|e| ConfigError::invalid(&key, e))?;
        }

        Ok(Some(settings))
    }
}
