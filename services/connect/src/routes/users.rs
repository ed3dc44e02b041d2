//! User sync from the sign-up flow

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::{
    error::{ApiError, ApiResult},
    repositories::SyncedUser,
    state::AppState,
    validation::{validate_email, validate_user_id},
};

#[derive(Debug, Deserialize)]
pub struct SyncUserRequest {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// Upsert the identity the auth service just created or found
pub async fn sync_user(
    State(state): State<AppState>,
    payload: Result<Json<SyncUserRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let missing = || ApiError::BadRequest("Missing user data".to_string());

    let Json(request) = payload.map_err(|_| missing())?;
    let (Some(id), Some(email)) = (request.id, request.email) else {
        return Err(missing());
    };

    validate_user_id(&id).map_err(ApiError::BadRequest)?;
    validate_email(&email).map_err(ApiError::BadRequest)?;

    state
        .users
        .upsert(&SyncedUser { id, email })
        .await
        .map_err(|e| {
            error!("Failed to sync user: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(json!({ "success": true })))
}
