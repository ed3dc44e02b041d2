//! Errors reported by the client library

use thiserror::Error;

/// Banner shown when the sign-up service answered but refused the request
pub const SIGNUP_REJECTED_BANNER: &str = "Error al procesar el registro";
/// Banner shown when the sign-up service could not be reached
pub const SIGNUP_UNREACHABLE_BANNER: &str = "Error al conectar con el servidor";
/// Banner shown when the form was submitted without an email
pub const SIGNUP_MISSING_EMAIL_BANNER: &str = "Ingresa tu email para comenzar";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {0}")]
    Status(reqwest::StatusCode),

    #[error("sign-up response carried no user")]
    SignupRejected,

    #[error("email is required")]
    MissingEmail,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored state is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("the authorization window closed without an outcome")]
    PopupClosed,
}

impl ClientError {
    /// Message for the sign-up form's error banner
    pub fn banner(&self) -> &'static str {
        match self {
            ClientError::SignupRejected => SIGNUP_REJECTED_BANNER,
            ClientError::MissingEmail => SIGNUP_MISSING_EMAIL_BANNER,
            _ => SIGNUP_UNREACHABLE_BANNER,
        }
    }
}
