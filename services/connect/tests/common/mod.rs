//! Shared fixtures: a fake upstream (token endpoint, webhook, Drive API),
//! session minting and router helpers.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU16, AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing,
};
use connect::{
    AppState,
    config::AppConfig,
    providers::{ProviderId, ProviderSettings},
    repositories::MemoryUserDirectory,
    session::{SessionClaims, SessionConfig},
    state_token::StateFormat,
    token_store::{MemoryTokenStore, TokenStoreKind},
    webhook::WebhookConfig,
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const SESSION_SECRET: &str = "integration-session-secret";
pub const APP_URL: &str = "http://app.test";
pub const WEBHOOK_USER: &str = "n8n";
pub const WEBHOOK_PASSWORD: &str = "hook-pass";

/// Raw bytes served for non-native Drive files
pub const RAW_BYTES: &[u8] = b"%PDF-1.4 raw";
/// Bytes served by the export endpoint
pub const EXPORTED_BYTES: &[u8] = b"PK exported";

/// Code the fake token endpoint refuses
pub const REJECTED_CODE: &str = "BAD";

/// What the fake upstream has seen
#[derive(Default)]
pub struct Recorded {
    pub token_calls: AtomicUsize,
    pub token_forms: Mutex<Vec<HashMap<String, String>>>,
    pub webhook_bodies: Mutex<Vec<Value>>,
    pub webhook_auth: Mutex<Vec<String>>,
    pub webhook_status: AtomicU16,
    pub export_mime_types: Mutex<Vec<String>>,
    pub drive_auth: Mutex<Vec<String>>,
}

impl Recorded {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn webhook_bodies(&self) -> Vec<Value> {
        self.webhook_bodies.lock().unwrap().clone()
    }

    pub fn fail_webhook(&self, status: StatusCode) {
        self.webhook_status.store(status.as_u16(), Ordering::SeqCst);
    }
}

pub struct Upstream {
    pub base_url: String,
    pub recorded: Arc<Recorded>,
}

async fn token(
    State(recorded): State<Arc<Recorded>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    recorded.token_calls.fetch_add(1, Ordering::SeqCst);
    let code = form.get("code").cloned().unwrap_or_default();
    recorded.token_forms.lock().unwrap().push(form);

    if code == REJECTED_CODE {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    let mut body = json!({
        "access_token": "T",
        "refresh_token": "R",
        "token_type": "Bearer",
        "instance_url": "https://acme.my.salesforce.com",
    });
    if code == "SHORT" {
        body["expires_in"] = json!(1800);
    }
    if code == "NO_REFRESH" {
        body.as_object_mut().unwrap().remove("refresh_token");
    }

    Json(body).into_response()
}

async fn webhook(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    recorded.webhook_auth.lock().unwrap().push(auth);
    recorded.webhook_bodies.lock().unwrap().push(body);

    match recorded.webhook_status.load(Ordering::SeqCst) {
        0 => StatusCode::OK,
        code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn record_drive_auth(recorded: &Recorded, headers: &HeaderMap) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    recorded.drive_auth.lock().unwrap().push(auth);
}

async fn drive_list(State(recorded): State<Arc<Recorded>>, headers: HeaderMap) -> Json<Value> {
    record_drive_auth(&recorded, &headers);
    Json(json!({
        "files": [
            {
                "id": "pdf1",
                "name": "report.pdf",
                "mimeType": "application/pdf",
                "webViewLink": "https://drive.google.com/file/d/pdf1/view"
            }
        ]
    }))
}

async fn drive_file(
    State(recorded): State<Arc<Recorded>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record_drive_auth(&recorded, &headers);

    if query.get("alt").map(String::as_str) == Some("media") {
        return RAW_BYTES.into_response();
    }

    match id.as_str() {
        "pdf1" => Json(json!({
            "id": "pdf1",
            "name": "report.pdf",
            "mimeType": "application/pdf",
            "size": "12"
        }))
        .into_response(),
        "doc1" => Json(json!({
            "id": "doc1",
            "name": "Quarterly plan",
            "mimeType": "application/vnd.google-apps.document"
        }))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "message": "File not found" } })),
        )
            .into_response(),
    }
}

async fn drive_export(
    State(recorded): State<Arc<Recorded>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> &'static [u8] {
    record_drive_auth(&recorded, &headers);
    let mime = query.get("mimeType").cloned().unwrap_or_default();
    recorded.export_mime_types.lock().unwrap().push(mime);
    EXPORTED_BYTES
}

/// Start the fake upstream on an ephemeral port
pub async fn spawn_upstream() -> Upstream {
    let recorded = Arc::new(Recorded::default());

    let app = Router::new()
        .route("/token", routing::post(token))
        .route("/webhook", routing::post(webhook))
        .route("/drive/files", routing::get(drive_list))
        .route("/drive/files/:id", routing::get(drive_file))
        .route("/drive/files/:id/export", routing::get(drive_export))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        base_url: format!("http://{}", addr),
        recorded,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: MemoryUserDirectory,
    pub tokens: MemoryTokenStore,
    pub upstream: Upstream,
}

/// Configuration pointing every provider at the fake upstream
pub fn test_config(upstream: &Upstream, state_format: StateFormat) -> AppConfig {
    let providers = ProviderId::ALL
        .into_iter()
        .map(|id| {
            let mut settings = ProviderSettings::defaults(id, APP_URL);
            settings.client_id = format!("{}-client", id);
            settings.client_secret = format!("{}-secret", id);
            settings.token_url = format!("{}/token", upstream.base_url);
            settings
        })
        .collect();

    AppConfig {
        bind_address: "127.0.0.1:0".to_string(),
        app_url: APP_URL.to_string(),
        secure_cookies: false,
        state_format,
        session: SessionConfig {
            secret: Some(SESSION_SECRET.to_string()),
            public_key: None,
            audience: None,
            cookie_name: "sb-access-token".to_string(),
        },
        webhook: WebhookConfig {
            url: format!("{}/webhook", upstream.base_url),
            username: WEBHOOK_USER.to_string(),
            password: WEBHOOK_PASSWORD.to_string(),
        },
        drive_api_base: format!("{}/drive", upstream.base_url),
        token_store: TokenStoreKind::Memory,
        providers,
    }
}

pub async fn test_app_with(state_format: StateFormat) -> TestApp {
    let upstream = spawn_upstream().await;
    let config = test_config(&upstream, state_format);

    let users = MemoryUserDirectory::new();
    let tokens = MemoryTokenStore::new();
    let state = AppState::new(config, Arc::new(tokens.clone()), Arc::new(users.clone())).unwrap();

    TestApp {
        router: connect::create_router(state.clone()),
        state,
        users,
        tokens,
        upstream,
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(StateFormat::Plain).await
}

/// HS256 session token for `user_id`, valid for an hour
pub fn session_token(user_id: &str) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id.to_lowercase())),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("POST").uri(uri)
}

pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", session_token(user_id))
}

pub fn json_body(value: Value) -> Body {
    Body::from(value.to_string())
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The `Set-Cookie` line for `name`, if any
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|line| line.starts_with(&format!("{}=", name)))
}
