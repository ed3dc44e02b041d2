//! Authorize, callback and disconnect handlers shared by every provider

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::found;
use crate::{
    cookies::{access_ttl, clear_token_cookies, set_token_cookies},
    error::{ApiError, ApiResult},
    providers::ProviderId,
    session::{CurrentSession, authorize_user},
    state::AppState,
    state_token::{self, StateError},
    token_store::TokenRecord,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeParams {
    pub user_id: Option<String>,
    /// `popup` asks the callback to finish on the completion page
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denied access
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteParams {
    pub provider: Option<String>,
    pub status: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Redirect the user to the provider's consent screen
pub async fn authorize(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(provider): Path<String>,
    Query(params): Query<AuthorizeParams>,
) -> ApiResult<Response> {
    let user_id = non_empty(params.user_id)
        .ok_or_else(|| ApiError::BadRequest("Missing userId".to_string()))?;

    authorize_user(&session, &user_id)?;

    let client = state.provider(&provider)?;
    let popup = params.mode.as_deref() == Some("popup");
    let oauth_state = state_token::issue(
        state.config.state_format,
        &user_id,
        popup,
        Utc::now().timestamp(),
    );

    info!(
        "Redirecting user {} to {} authorization (popup: {})",
        user_id,
        client.provider(),
        popup
    );

    Ok(found(client.authorize_url(&oauth_state)))
}

/// Finish the authorization code flow
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    let client = state.provider(&provider)?;
    let provider = client.provider();
    let settings = client.settings();

    if let Some(reason) = params.error {
        warn!("{} reported an authorization error: {}", provider, reason);
        return Ok(found(state.completion_url(provider, false, false)));
    }

    let (Some(code), Some(raw_state)) = (non_empty(params.code), non_empty(params.state)) else {
        return Err(ApiError::BadRequest("Missing code or state".to_string()));
    };

    let session = state.sessions.authenticate(&headers, &jar)?;

    let verified = state_token::verify(
        state.config.state_format,
        &raw_state,
        &session.user_id,
        Utc::now().timestamp(),
    )
    .map_err(|e| match e {
        StateError::Malformed => ApiError::BadRequest("Invalid state".to_string()),
        StateError::Mismatch | StateError::Expired => {
            warn!(
                target: "security",
                session_user = %session.user_id,
                provider = %provider,
                "Rejected OAuth callback: {}",
                e
            );
            ApiError::Forbidden
        }
    })?;

    let grant = match client.exchange_code(&code).await {
        Ok(grant) => grant,
        Err(e) => {
            error!("{} token exchange failed: {}", provider, e);
            return Ok(found(state.completion_url(provider, false, verified.popup)));
        }
    };

    if settings.forward_tokens {
        if let Err(e) = state.webhook.forward_tokens(provider, &grant).await {
            error!("Failed to forward {} tokens: {}", provider, e);
            return Ok(found(state.completion_url(provider, false, verified.popup)));
        }
    }

    let record = TokenRecord::new(provider, &grant, access_ttl(settings, &grant));
    if let Err(e) = state.tokens.save(&verified.user_id, &record).await {
        error!("Failed to persist {} tokens: {}", provider, e);
        return Ok(found(state.completion_url(provider, false, verified.popup)));
    }

    let jar = set_token_cookies(jar, settings, &grant, state.config.secure_cookies);

    info!("Connected {} for user {}", provider, verified.user_id);

    Ok((jar, found(state.completion_url(provider, true, verified.popup))).into_response())
}

/// Forget a provider connection: cookies and persisted record
pub async fn disconnect(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let provider = state.provider(&provider)?.provider();

    state
        .tokens
        .remove(&session.user_id, provider)
        .await
        .map_err(|e| {
            error!("Failed to remove {} tokens: {}", provider, e);
            ApiError::InternalServerError
        })?;

    info!("Disconnected {} for user {}", provider, session.user_id);

    Ok((
        clear_token_cookies(jar, provider),
        Json(json!({
            "success": true,
            "provider": provider,
        })),
    ))
}

/// Page a popup lands on; hands the outcome to the opener window
pub async fn popup_complete(
    State(state): State<AppState>,
    Query(params): Query<CompleteParams>,
) -> ApiResult<Html<String>> {
    let provider: ProviderId = params
        .provider
        .as_deref()
        .unwrap_or_default()
        .parse()?;
    let status = match params.status.as_deref() {
        Some("success") => "success",
        _ => "error",
    };

    let message = json!({
        "type": "atom-oauth-complete",
        "provider": provider,
        "status": status,
    });
    let origin = Value::String(state.config.app_url.clone());

    Ok(Html(format!(
        r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>ATOM Analytics</title></head>
  <body>
    <p>You can close this window.</p>
    <script>
      if (window.opener) {{
        window.opener.postMessage({message}, {origin});
      }}
      window.close();
    </script>
  </body>
</html>
"#
    )))
}
