//! Starting a connect attempt and waiting for its outcome

use reqwest::Url;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    callback::{CallbackOutcome, ConnectStatus},
    error::ClientError,
};

/// `type` of the message the completion page posts to its opener
pub const COMPLETION_MESSAGE_TYPE: &str = "atom-oauth-complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// Navigate the whole page and land back on `/chat`
    #[default]
    Redirect,
    /// Authorize in a separate window that reports back when done
    Popup,
}

/// UI behaviour of the connect dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectOptions {
    pub mode: ConnectMode,
    /// Whether connected Drive files can be shared with the automation
    pub share_enabled: bool,
}

impl ConnectOptions {
    /// Absolute authorize URL on the app origin
    pub fn authorize_url(&self, app_url: &Url, provider: &str, user_id: &str) -> Result<Url, ClientError> {
        let mut url = app_url
            .join(&format!("/api/oauth/{}", provider))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("userId", user_id);
            if self.mode == ConnectMode::Popup {
                query.append_pair("mode", "popup");
            }
        }

        Ok(url)
    }

    /// Relay endpoint for files picked from `provider`
    ///
    /// `None` when sharing is switched off or the provider has no file picker.
    pub fn share_url(&self, app_url: &Url, provider: &str) -> Result<Option<Url>, ClientError> {
        if !self.share_enabled || provider != "google-drive" {
            return Ok(None);
        }

        app_url
            .join(&format!("/api/oauth/{}/send-to-n8n", provider))
            .map(Some)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }
}

/// Origin-relative authorize path, e.g. `/api/oauth/hubspot?userId=U1`
pub fn authorize_path(provider: &str, user_id: &str, options: &ConnectOptions) -> String {
    let url = Url::parse("http://localhost")
        .map_err(|e| ClientError::InvalidUrl(e.to_string()))
        .and_then(|base| options.authorize_url(&base, provider, user_id));

    match url {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => format!("/api/oauth/{}", provider),
    }
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(rename = "type")]
    kind: String,
    provider: String,
    status: ConnectStatus,
}

/// Popup-side half: delivers the outcome once
#[derive(Debug)]
pub struct CompletionSender {
    tx: oneshot::Sender<CallbackOutcome>,
}

/// Opener-side half: resolves with the outcome
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: oneshot::Receiver<CallbackOutcome>,
}

/// Channel that replaces polling the popup for closure
///
/// Dropping the sender without completing stands for the popup being closed
/// by the user.
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = oneshot::channel();
    (CompletionSender { tx }, CompletionReceiver { rx })
}

impl CompletionSender {
    pub fn complete(self, outcome: CallbackOutcome) {
        if self.tx.send(outcome).is_err() {
            debug!("Connect outcome arrived after the opener stopped waiting");
        }
    }

    /// Deliver a message posted by the completion page
    ///
    /// Messages of another type are handed back so the caller can keep
    /// listening.
    pub fn deliver(self, raw: &str) -> Result<(), Self> {
        match serde_json::from_str::<CompletionMessage>(raw) {
            Ok(message) if message.kind == COMPLETION_MESSAGE_TYPE => {
                self.complete(CallbackOutcome {
                    provider: message.provider,
                    status: message.status,
                });
                Ok(())
            }
            _ => Err(self),
        }
    }
}

impl CompletionReceiver {
    pub async fn wait(self) -> Result<CallbackOutcome, ClientError> {
        self.rx.await.map_err(|_| ClientError::PopupClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_path() {
        let redirect = ConnectOptions::default();
        assert_eq!(
            authorize_path("salesforce", "U1", &redirect),
            "/api/oauth/salesforce?userId=U1"
        );

        let popup = ConnectOptions {
            mode: ConnectMode::Popup,
            share_enabled: true,
        };
        assert_eq!(
            authorize_path("google-drive", "a b", &popup),
            "/api/oauth/google-drive?userId=a+b&mode=popup"
        );
    }

    #[test]
    fn test_authorize_url_keeps_origin() {
        let app_url = Url::parse("https://atom.example.com/chat").unwrap();
        let url = ConnectOptions::default()
            .authorize_url(&app_url, "hubspot", "U1")
            .unwrap();
        assert_eq!(url.as_str(), "https://atom.example.com/api/oauth/hubspot?userId=U1");
    }

    #[test]
    fn test_share_url_follows_share_switch() {
        let app_url = Url::parse("https://atom.example.com/chat").unwrap();

        let disabled = ConnectOptions::default();
        assert_eq!(disabled.share_url(&app_url, "google-drive").unwrap(), None);

        let enabled = ConnectOptions {
            share_enabled: true,
            ..ConnectOptions::default()
        };
        assert_eq!(
            enabled.share_url(&app_url, "google-drive").unwrap().unwrap().as_str(),
            "https://atom.example.com/api/oauth/google-drive/send-to-n8n"
        );
        assert_eq!(enabled.share_url(&app_url, "hubspot").unwrap(), None);
    }

    #[tokio::test]
    async fn test_completion_message_resolves_receiver() {
        let (sender, receiver) = completion_channel();

        let sender = sender
            .deliver(r#"{"type":"unrelated","provider":"x","status":"success"}"#)
            .unwrap_err();
        assert!(
            sender
                .deliver(r#"{"type":"atom-oauth-complete","provider":"hubspot","status":"success"}"#)
                .is_ok()
        );

        let outcome = receiver.wait().await.unwrap();
        assert_eq!(outcome.provider, "hubspot");
        assert_eq!(outcome.status, ConnectStatus::Success);
    }

    #[tokio::test]
    async fn test_closed_popup_is_reported() {
        let (sender, receiver) = completion_channel();
        drop(sender);

        assert!(matches!(receiver.wait().await, Err(ClientError::PopupClosed)));
    }
}
