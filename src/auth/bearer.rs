//! Bearer token extraction from the Authorization header

use crate::auth::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Parse `Authorization: Bearer <token>` and return the token.
///
/// The scheme is matched case-sensitively and the value must consist of exactly two
/// whitespace-separated fields.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let fields: Vec<&str> = value.split_whitespace().collect();
    match fields.as_slice() {
        [] => Err(AuthError::MissingHeader),
        ["Bearer", token] => Ok((*token).to_string()),
        _ => Err(AuthError::MalformedHeader),
    }
}
