//! Email sign-up through the automation webhook

use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    error::ClientError,
    session::{User, UserStore},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupResponse {
    #[serde(default)]
    create_user: Value,
    #[serde(default)]
    user_found: Value,
    user_data: Option<User>,
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone)]
pub struct SignupClient {
    http: reqwest::Client,
    signup_url: Url,
    sync_url: Url,
}

impl SignupClient {
    /// `signup_url` is the webhook; `app_url` the origin serving `/api/users/sync`
    pub fn new(http: reqwest::Client, signup_url: &str, app_url: &str) -> Result<Self, ClientError> {
        let signup_url = Url::parse(signup_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let sync_url = Url::parse(app_url)
            .and_then(|base| base.join("/api/users/sync"))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            http,
            signup_url,
            sync_url,
        })
    }

    /// Sign up or sign in `email`, recording the user in `store`
    ///
    /// The webhook answers with `createUser` for a new account or
    /// `userFound` for an existing one; both carry `userData`.
    pub async fn sign_up(&self, email: &str, store: &mut UserStore) -> Result<User, ClientError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ClientError::MissingEmail);
        }

        let response = self
            .http
            .post(self.signup_url.clone())
            .json(&json!({ "email": email }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        let body: SignupResponse = response.json().await?;
        let accepted = truthy(&body.create_user) || truthy(&body.user_found);
        let user = match (accepted, body.user_data) {
            (true, Some(user)) => user,
            _ => return Err(ClientError::SignupRejected),
        };

        info!("Signed in user: {}", user.id);
        store.set_user(user.clone());

        if let Err(e) = self.sync(&user).await {
            warn!("User sync failed: {}", e);
        }

        Ok(user)
    }

    /// Mirror the user into the service's `users` table
    pub async fn sync(&self, user: &User) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.sync_url.clone())
            .json(user)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        Ok(())
    }
}
