//! OAuth `state` parameter handling
//!
//! The state binds a callback to the user who started the flow. It is
//! either the bare user id or a JSON envelope that adds an issue time, a
//! nonce and the popup flag. Popup flows always use the envelope.

use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::config::ConfigError;

/// Maximum age of an envelope state, in seconds
pub const STATE_MAX_AGE: i64 = 10 * 60;

/// Tolerated clock skew for envelopes issued "in the future"
const CLOCK_SKEW: i64 = 60;

/// Wire format of issued states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFormat {
    #[default]
    Plain,
    Envelope,
}

impl FromStr for StateFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(StateFormat::Plain),
            "envelope" => Ok(StateFormat::Envelope),
            other => Err(ConfigError::invalid(
                "OAUTH_STATE_FORMAT",
                format!("expected \"plain\" or \"envelope\", got \"{}\"", other),
            )),
        }
    }
}

/// JSON form of the state parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEnvelope {
    pub user_id: String,
    /// Unix timestamp, seconds
    pub issued_at: i64,
    pub nonce: String,
    #[serde(default)]
    pub popup: bool,
}

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedState {
    pub user_id: String,
    pub popup: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("state parameter is malformed")]
    Malformed,

    #[error("state was issued for another user")]
    Mismatch,

    #[error("state has expired")]
    Expired,
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Issue a state for `user_id` at `now` (unix seconds)
pub fn issue(format: StateFormat, user_id: &str, popup: bool, now: i64) -> String {
    if format == StateFormat::Plain && !popup {
        return user_id.to_string();
    }

    let envelope = StateEnvelope {
        user_id: user_id.to_string(),
        issued_at: now,
        nonce: nonce(),
        popup,
    };

    // Serializing a struct of strings, integers and bools cannot fail.
    serde_json::to_string(&envelope).unwrap_or_else(|_| user_id.to_string())
}

/// Verify a state returned by the provider against the session user id
///
/// The comparison is exact. Under [`StateFormat::Envelope`] a bare user id
/// is rejected since it carries no issue time.
pub fn verify(
    format: StateFormat,
    raw: &str,
    session_user_id: &str,
    now: i64,
) -> Result<VerifiedState, StateError> {
    if raw.is_empty() {
        return Err(StateError::Malformed);
    }

    if !raw.starts_with('{') {
        if format == StateFormat::Envelope {
            return Err(StateError::Malformed);
        }
        if raw != session_user_id {
            return Err(StateError::Mismatch);
        }
        return Ok(VerifiedState {
            user_id: raw.to_string(),
            popup: false,
        });
    }

    let envelope: StateEnvelope = serde_json::from_str(raw).map_err(|_| StateError::Malformed)?;

    if envelope.user_id.is_empty() {
        return Err(StateError::Malformed);
    }
    if envelope.user_id != session_user_id {
        return Err(StateError::Mismatch);
    }
    if now - envelope.issued_at > STATE_MAX_AGE || envelope.issued_at - now > CLOCK_SKEW {
        return Err(StateError::Expired);
    }

    Ok(VerifiedState {
        user_id: envelope.user_id,
        popup: envelope.popup,
    })
}
