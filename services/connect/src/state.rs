//! Application state shared across handlers

use std::{collections::HashMap, sync::Arc};

use crate::{
    config::AppConfig,
    drive::DriveClient,
    error::ApiError,
    oauth::{OAuthClient, OAuthError},
    providers::ProviderId,
    repositories::UserDirectory,
    session::SessionValidator,
    token_store::TokenStore,
    webhook::WebhookClient,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionValidator,
    pub providers: Arc<HashMap<ProviderId, OAuthClient>>,
    pub webhook: WebhookClient,
    pub drive: DriveClient,
    pub tokens: Arc<dyn TokenStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn UserDirectory>,
    ) -> anyhow::Result<Self> {
        let sessions = SessionValidator::new(&config.session)?;

        let providers = config
            .providers
            .iter()
            .cloned()
            .map(|settings| OAuthClient::new(settings).map(|client| (client.provider(), client)))
            .collect::<Result<HashMap<_, _>, OAuthError>>()?;

        let http = reqwest::Client::new();
        let webhook = WebhookClient::new(http.clone(), config.webhook.clone());
        let drive = DriveClient::new(http, config.drive_api_base.clone());

        Ok(Self {
            config: Arc::new(config),
            sessions,
            providers: Arc::new(providers),
            webhook,
            drive,
            tokens,
            users,
        })
    }

    /// Client of an enabled provider, 404 for unknown or disabled ids
    pub fn provider(&self, id: &str) -> Result<&OAuthClient, ApiError> {
        let provider: ProviderId = id.parse()?;
        self.providers
            .get(&provider)
            .ok_or_else(|| ApiError::NotFound(format!("Provider {} is not enabled", provider)))
    }

    /// Where the browser lands once a connect attempt finishes
    pub fn completion_url(&self, provider: ProviderId, success: bool, popup: bool) -> String {
        let path = if popup { "/oauth/complete" } else { "/chat" };
        let status = if success { "success" } else { "error" };
        format!(
            "{}{}?provider={}&status={}",
            self.config.app_url, path, provider, status
        )
    }
}
