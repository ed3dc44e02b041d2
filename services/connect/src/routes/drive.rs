//! Google Drive picker listing and file relay

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::CookieJar;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{
    cookies::access_cookie_name,
    drive::DriveFile,
    error::{ApiError, ApiResult},
    providers::ProviderId,
    session::{CurrentSession, Session, authorize_user},
    state::AppState,
    validation::validate_file_id,
    webhook::FileRelayPayload,
};

/// Body of a relay request
///
/// Other fields sent by the picker are ignored; the MIME type always comes
/// from Drive.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFileRequest {
    pub file_id: Option<String>,
    /// Display name chosen in the picker; Drive metadata is used otherwise
    pub file_name: Option<String>,
    pub user_id: Option<String>,
}

fn require_drive(state: &AppState, provider: &str) -> ApiResult<()> {
    match state.provider(provider)?.provider() {
        ProviderId::GoogleDrive => Ok(()),
        other => Err(ApiError::NotFound(format!(
            "{} does not serve Drive files",
            other
        ))),
    }
}

/// Drive token from the cookie, falling back to the persisted record
async fn drive_token(state: &AppState, session: &Session, jar: &CookieJar) -> Option<String> {
    if let Some(cookie) = jar.get(&access_cookie_name(ProviderId::GoogleDrive)) {
        return Some(cookie.value().to_string());
    }

    match state
        .tokens
        .load(&session.user_id, ProviderId::GoogleDrive)
        .await
    {
        Ok(record) => record.map(|record| record.access_token),
        Err(e) => {
            error!("Failed to load Drive tokens: {}", e);
            None
        }
    }
}

/// List the files the picker may offer
pub async fn list_files(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> ApiResult<Json<Vec<DriveFile>>> {
    require_drive(&state, &provider)?;

    let token = drive_token(&state, &session, &jar)
        .await
        .ok_or(ApiError::Unauthenticated)?;

    let files = state.drive.list_files(&token).await.map_err(|e| {
        error!("Drive listing failed: {}", e);
        ApiError::Upstream("Google Drive request failed".to_string())
    })?;

    Ok(Json(files))
}

/// Download a Drive file and relay it to the automation webhook
pub async fn send_to_webhook(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(provider): Path<String>,
    jar: CookieJar,
    payload: Result<Json<SendFileRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    require_drive(&state, &provider)?;

    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;

    if let Some(user_id) = request.user_id.as_deref() {
        authorize_user(&session, user_id)?;
    }

    let file_id = request
        .file_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing fileId".to_string()))?;
    validate_file_id(&file_id).map_err(ApiError::BadRequest)?;

    let token = drive_token(&state, &session, &jar)
        .await
        .ok_or_else(|| ApiError::BadRequest("Google Drive is not connected".to_string()))?;

    let contents = state
        .drive
        .fetch_contents(&token, &file_id)
        .await
        .map_err(|e| {
            error!("Drive download of {} failed: {}", file_id, e);
            ApiError::Upstream("Google Drive request failed".to_string())
        })?;

    let file_name = request
        .file_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| contents.file.name.clone());

    let relay = FileRelayPayload {
        data: STANDARD.encode(&contents.bytes),
        file_name: file_name.clone(),
        mime_type: contents.mime_type.clone(),
        file_id: file_id.clone(),
        source: ProviderId::GoogleDrive,
    };

    state.webhook.relay_file(&relay).await.map_err(|e| {
        error!("Relay of {} failed: {}", file_id, e);
        ApiError::Upstream("Failed to send file to the automation webhook".to_string())
    })?;

    info!("Relayed file {} for user {}", file_id, session.user_id);

    Ok(Json(json!({
        "success": true,
        "file": file_name,
        "mimeType": contents.mime_type,
    })))
}
