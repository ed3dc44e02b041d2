//! Service configuration loaded from the environment

use thiserror::Error;

use crate::{
    providers::{ProviderId, ProviderSettings},
    session::SessionConfig,
    state_token::StateFormat,
    token_store::TokenStoreKind,
    webhook::WebhookConfig,
};

/// Default Google Drive REST endpoint
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Configuration errors raised while reading the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Read a variable, treating an empty value as unset
pub(crate) fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

/// Top-level configuration for the connect service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: String,
    /// Public origin of the web application, without trailing slash
    pub app_url: String,
    /// Whether token cookies carry the `Secure` attribute
    pub secure_cookies: bool,
    /// Shape of the OAuth `state` parameter
    pub state_format: StateFormat,
    pub session: SessionConfig,
    pub webhook: WebhookConfig,
    pub drive_api_base: String,
    pub token_store: TokenStoreKind,
    /// Enabled providers; a provider without a client id is left out
    pub providers: Vec<ProviderSettings>,
}

impl AppConfig {
    /// Create the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDRESS`: listen address (default: "0.0.0.0:3000")
    /// - `APP_URL`: public origin used for redirects (default: "http://localhost:3000")
    /// - `APP_ENV`: "production" turns on `Secure` cookies
    /// - `OAUTH_STATE_FORMAT`: "plain" (default) or "envelope"
    /// - `GOOGLE_DRIVE_API_BASE`: Drive API root (default: the public endpoint)
    /// - `TOKEN_STORE`: "memory" (default) or "redis"
    ///
    /// Session, webhook and provider variables are documented on their own
    /// config types.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_address = optional("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let app_url = optional("APP_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let secure_cookies = optional("APP_ENV").is_some_and(|env| env == "production");

        let state_format = match optional("OAUTH_STATE_FORMAT") {
            Some(value) => value.parse()?,
            None => StateFormat::default(),
        };

        let token_store = match optional("TOKEN_STORE") {
            Some(value) => value.parse()?,
            None => TokenStoreKind::default(),
        };

        let providers = ProviderId::ALL
            .iter()
            .filter_map(|id| ProviderSettings::from_env(*id, &app_url).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AppConfig {
            bind_address,
            app_url,
            secure_cookies,
            state_format,
            session: SessionConfig::from_env()?,
            webhook: WebhookConfig::from_env()?,
            drive_api_base: optional("GOOGLE_DRIVE_API_BASE")
                .unwrap_or_else(|| DRIVE_API_BASE.to_string()),
            token_store,
            providers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "APP_URL",
        "APP_ENV",
        "OAUTH_STATE_FORMAT",
        "TOKEN_STORE",
        "SESSION_JWT_SECRET",
        "SESSION_JWT_PUBLIC_KEY",
        "WEBHOOK_URL",
        "WEBHOOK_USERNAME",
        "WEBHOOK_PASSWORD",
        "GOOGLE_CLIENT_ID",
        "GOOGLE_CLIENT_SECRET",
        "SALESFORCE_CLIENT_ID",
        "HUBSPOT_CLIENT_ID",
    ];

    fn reset() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    fn set_minimum() {
        unsafe {
            std::env::set_var("SESSION_JWT_SECRET", "test-secret");
            std::env::set_var("WEBHOOK_URL", "https://automation.example.com/webhook/integrations");
            std::env::set_var("WEBHOOK_USERNAME", "atom");
            std::env::set_var("WEBHOOK_PASSWORD", "hunter2");
        }
    }

    #[test]
    #[serial]
    fn test_defaults_with_minimum_environment() {
        reset();
        set_minimum();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.app_url, "http://localhost:3000");
        assert!(!config.secure_cookies);
        assert_eq!(config.state_format, StateFormat::Plain);
        assert_eq!(config.token_store, TokenStoreKind::Memory);
        assert!(config.providers.is_empty());

        reset();
    }

    #[test]
    #[serial]
    fn test_production_and_enabled_providers() {
        reset();
        set_minimum();
        unsafe {
            std::env::set_var("APP_URL", "https://atom.example.com/");
            std::env::set_var("APP_ENV", "production");
            std::env::set_var("GOOGLE_CLIENT_ID", "google-client");
            std::env::set_var("GOOGLE_CLIENT_SECRET", "google-secret");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.app_url, "https://atom.example.com");
        assert!(config.secure_cookies);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].id, ProviderId::GoogleDrive);
        assert_eq!(
            config.providers[0].redirect_uri,
            "https://atom.example.com/api/oauth/callback/google-drive"
        );

        reset();
    }

    #[test]
    #[serial]
    fn test_provider_without_secret_is_an_error() {
        reset();
        set_minimum();
        unsafe {
            std::env::set_var("HUBSPOT_CLIENT_ID", "hubspot-client");
        }

        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::Missing(key)) if key == "HUBSPOT_CLIENT_SECRET"));

        reset();
    }

    #[test]
    #[serial]
    fn test_unknown_state_format_is_rejected() {
        reset();
        set_minimum();
        unsafe {
            std::env::set_var("OAUTH_STATE_FORMAT", "jwt");
        }

        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::Invalid { .. })
        ));

        reset();
    }
}
