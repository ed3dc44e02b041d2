//! Connect service routes

mod drive;
mod oauth;
mod users;

use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the router for the connect service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/oauth/callback/:provider", get(oauth::callback))
        .route("/api/oauth/:provider", get(oauth::authorize))
        .route("/api/oauth/:provider/disconnect", post(oauth::disconnect))
        // Only google-drive serves these; other providers get a 404
        .route("/api/oauth/:provider/files", get(drive::list_files))
        .route("/api/oauth/:provider/send-to-n8n", post(drive::send_to_webhook))
        .route("/oauth/complete", get(oauth::popup_complete))
        .route("/api/users/sync", post(users::sync_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "connect-service"
    }))
}

/// `302 Found` to `location`
pub(crate) fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
