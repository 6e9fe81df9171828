//! Errors raised by the authentication components

use thiserror::Error;

/// Failure modes of token issuing/validation, credential hashing and header parsing.
///
/// None of the variants carry token or password material, so they are safe to log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token ttl must be greater than zero")]
    InvalidTtl,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token subject is missing or not a valid identifier")]
    MalformedSubject,

    #[error("token could not be decoded")]
    MalformedToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("Authorization header is not set")]
    MissingHeader,

    #[error("invalid bearer token format")]
    MalformedHeader,

    #[error("token signing algorithm is not allowed")]
    UnsupportedAlgorithm,

    #[error("token issued in the future")]
    IssuedInFuture,

    #[error("token claim missing or invalid: {0}")]
    MissingClaim(&'static str),

    #[error("no signing key matches the token")]
    UnknownKey,

    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("identity provider request failed: {0}")]
    Provider(String),

    #[error("identity provider rejected the credentials")]
    ProviderRejected,

    #[error("password exceeds the maximum supported length")]
    InputTooLong,

    #[error("insecure password, try including more special characters, using uppercase letters, using numbers or using a longer password")]
    WeakPassword,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("no authenticated identity on request")]
    MissingIdentity,
}

impl AuthError {
    /// Whether the failure is caused by our own infrastructure rather than the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidTtl
                | AuthError::KeySetUnavailable(_)
                | AuthError::Provider(_)
                | AuthError::Hashing(_)
                | AuthError::MissingIdentity
        )
    }
}
