//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate a user id claimed by the client
pub fn validate_user_id(user_id: &str) -> Result<(), String> {
    if user_id.is_empty() {
        return Err("User id is required".to_string());
    }

    if user_id.len() > 128 {
        return Err("User id must be at most 128 characters long".to_string());
    }

    if user_id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("User id cannot contain whitespace".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a Drive file id before it is placed in an API path
pub fn validate_file_id(file_id: &str) -> Result<(), String> {
    static FILE_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FILE_ID_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,256}$").expect("Failed to compile file id regex"));

    if !regex.is_match(file_id) {
        return Err("Invalid fileId".to_string());
    }

    Ok(())
}
