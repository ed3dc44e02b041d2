//! Session validation
//!
//! Sessions are issued by the external auth service as signed JWTs. They are
//! read from `Authorization: Bearer` or from the session cookie, and the
//! subject is compared with any user id a request claims to act for. This is
//! the only access-control check in the service.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{ConfigError, optional},
    error::ApiError,
    state::AppState,
};

/// Session validation configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared HS256 secret of the auth service
    pub secret: Option<String>,
    /// RS256 public key in PEM format; takes precedence over `secret`
    pub public_key: Option<String>,
    /// Expected `aud` claim, if any
    pub audience: Option<String>,
    /// Cookie that carries the session token for browser requests
    pub cookie_name: String,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_JWT_SECRET`: HS256 secret of the auth service
    /// - `SESSION_JWT_PUBLIC_KEY`: RS256 public key (PEM format) or path to a PEM file
    /// - `SESSION_JWT_AUDIENCE`: expected audience (optional)
    /// - `SESSION_COOKIE_NAME`: session cookie name (default: "sb-access-token")
    ///
    /// One of the secret or the public key must be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let public_key = match optional("SESSION_JWT_PUBLIC_KEY") {
            Some(key) if key.starts_with("-----BEGIN") => Some(key),
            Some(path) => Some(
                std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::invalid("SESSION_JWT_PUBLIC_KEY", e))?
                    .trim()
                    .to_string(),
            ),
            None => None,
        };
        let secret = optional("SESSION_JWT_SECRET");

        if public_key.is_none() && secret.is_none() {
            return Err(ConfigError::Missing("SESSION_JWT_SECRET".to_string()));
        }

        Ok(SessionConfig {
            secret,
            public_key,
            audience: optional("SESSION_JWT_AUDIENCE"),
            cookie_name: optional("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "sb-access-token".to_string()),
        })
    }
}

/// Claims read from the session token
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration time
    pub exp: u64,
}

/// Authenticated identity of the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("no valid session")]
    Unauthenticated,

    #[error("session user {session_user} does not match requested user {claimed}")]
    Forbidden {
        session_user: String,
        claimed: String,
    },
}

/// Verifies session tokens
#[derive(Clone)]
pub struct SessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl SessionValidator {
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let (decoding_key, algorithm) = match (&config.public_key, &config.secret) {
            (Some(pem), _) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| ConfigError::invalid("SESSION_JWT_PUBLIC_KEY", e))?,
                Algorithm::RS256,
            ),
            (None, Some(secret)) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, None) => return Err(ConfigError::Missing("SESSION_JWT_SECRET".to_string())),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding_key,
            validation,
            cookie_name: config.cookie_name.clone(),
        })
    }

    fn token<'a>(&self, headers: &'a HeaderMap, jar: &'a CookieJar) -> Option<&'a str> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        bearer.or_else(|| jar.get(&self.cookie_name).map(|cookie| cookie.value()))
    }

    /// Resolve the session of a request
    pub fn authenticate(&self, headers: &HeaderMap, jar: &CookieJar) -> Result<Session, SessionError> {
        let token = self.token(headers, jar).ok_or(SessionError::Unauthenticated)?;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Rejected session token: {}", e);
                SessionError::Unauthenticated
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(SessionError::Unauthenticated);
        }

        Ok(Session {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Check that the session acts for `claimed_user_id`
pub fn authorize_user(session: &Session, claimed_user_id: &str) -> Result<(), SessionError> {
    if session.user_id == claimed_user_id {
        return Ok(());
    }

    warn!(
        target: "security",
        session_user = %session.user_id,
        claimed_user = %claimed_user_id,
        "Session does not match the requested user id"
    );

    Err(SessionError::Forbidden {
        session_user: session.user_id.clone(),
        claimed: claimed_user_id.to_string(),
    })
}

/// Extractor that rejects requests without a valid session
pub struct CurrentSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        state
            .sessions
            .authenticate(&parts.headers, &jar)
            .map(CurrentSession)
            .map_err(ApiError::from)
    }
}
