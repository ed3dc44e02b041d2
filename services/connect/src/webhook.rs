//! Client for the workflow-automation webhook
//!
//! Every call is a single POST with basic-auth credentials; the webhook's
//! HTTP status is the only acknowledgment.

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
    config::{ConfigError, required},
    oauth::TokenGrant,
    providers::ProviderId,
};

/// Webhook endpoint and credentials
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl WebhookConfig {
    /// Create a new WebhookConfig from environment variables
    ///
    /// # Environment Variables
    /// - `WEBHOOK_URL`: automation webhook endpoint
    /// - `WEBHOOK_USERNAME`, `WEBHOOK_PASSWORD`: basic-auth credentials
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(WebhookConfig {
            url: required("WEBHOOK_URL")?,
            username: required("WEBHOOK_USERNAME")?,
            password: required("WEBHOOK_PASSWORD")?,
        })
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook answered {0}")]
    Status(StatusCode),
}

/// Token hand-off sent after a successful callback
#[derive(Debug, Serialize)]
pub struct TokenForward<'a> {
    #[serde(rename = "type")]
    pub provider: ProviderId,
    pub access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<&'a str>,
}

/// File hand-off sent by the relay route
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRelayPayload {
    /// Base64-encoded file contents
    pub data: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_id: String,
    #[serde(rename = "type")]
    pub source: ProviderId,
}

#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookClient {
    pub fn new(http: reqwest::Client, config: WebhookConfig) -> Self {
        Self { http, config }
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<(), WebhookError> {
        let response = self
            .http
            .post(&self.config.url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status));
        }

        Ok(())
    }

    /// Forward freshly obtained tokens for one-shot use by the automation
    pub async fn forward_tokens(
        &self,
        provider: ProviderId,
        grant: &TokenGrant,
    ) -> Result<(), WebhookError> {
        info!("Forwarding {} tokens to the automation webhook", provider);

        self.post(&TokenForward {
            provider,
            access_token: &grant.access_token,
            instance_url: grant.instance_url.as_deref(),
        })
        .await
    }

    /// Relay a whole file to the automation webhook
    pub async fn relay_file(&self, payload: &FileRelayPayload) -> Result<(), WebhookError> {
        info!(
            "Relaying file {} ({}, {} encoded bytes) to the automation webhook",
            payload.file_id,
            payload.mime_type,
            payload.data.len()
        );

        self.post(payload).await
    }
}
