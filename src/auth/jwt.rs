//! Session token minting and validation
//! HS256-signed JWTs whose subject is the user id

use crate::auth::AuthError;
use crate::config::AppConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into every session token.
pub const TOKEN_ISSUER: &str = "service";

/// Claims carried by a session (access) token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,

    /// Issued at
    pub iat: i64,

    /// Not before
    pub nbf: i64,

    /// Expiration
    pub exp: i64,

    /// Subject (user ID)
    #[serde(default)]
    pub sub: String,
}

/// Mint a signed session token for `subject`, valid for `ttl`.
pub fn mint(subject: Uuid, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    if ttl <= Duration::zero() {
        return Err(AuthError::InvalidTtl);
    }

    let now = Utc::now();
    let expires_at = now.checked_add_signed(ttl).ok_or(AuthError::InvalidTtl)?;
    let claims = Claims {
        iss: TOKEN_ISSUER.to_string(),
        iat: now.timestamp(),
        nbf: now.timestamp(),
        exp: expires_at.timestamp(),
        sub: subject.to_string(),
    };

    sign(&claims, secret)
}

/// Verify `token` against `secret` and return its subject.
pub fn validate(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = ?e.kind(), "Session token rejected");
        match e.kind() {
            ErrorKind::InvalidSignature => AuthError::BadSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            // nbf is stamped at mint time, so a premature token is treated like a forged one
            ErrorKind::ImmatureSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
            _ => AuthError::MalformedToken,
        }
    })?;

    // jsonwebtoken accepts exp == now; a token is only valid while exp is strictly ahead
    if data.claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }

    if data.claims.sub.is_empty() {
        return Err(AuthError::MalformedSubject);
    }

    Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::MalformedSubject)
}

/// Convert a configured lifetime in seconds. `None` when it does not fit a `Duration`.
pub fn ttl_from_secs(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

pub(crate) fn sign(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to encode session token: {:?}", e);
        AuthError::MalformedToken
    })
}

/// Session token service bound to the configured secret and access-token lifetime
pub struct JwtService {
    secret: Secret<String>,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: Secret<String>, access_token_exp_secs: u64) -> Self {
        Self {
            secret,
            // An unrepresentable lifetime surfaces as InvalidTtl on issue
            access_token_ttl: ttl_from_secs(access_token_exp_secs).unwrap_or_else(Duration::zero),
        }
    }

    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.security.jwt_secret.clone(),
            config.security.access_token_exp_secs,
        )
    }

    /// Generate an access token for the user
    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        mint(user_id, self.secret.expose_secret(), self.access_token_ttl)
    }

    /// Validate an access token and return the user id it was issued to
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        validate(token, self.secret.expose_secret())
    }

    /// Access-token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.access_token_ttl.num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_32_characters_long!";

    fn claims_for(sub: &str, iat: i64, exp: i64) -> Claims {
        Claims {
            iss: TOKEN_ISSUER.to_string(),
            iat,
            nbf: iat,
            exp,
            sub: sub.to_string(),
        }
    }

    #[test]
    fn test_mint_and_validate() {
        let user_id = Uuid::new_v4();
        let token = mint(user_id, SECRET, Duration::minutes(60)).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(validate(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn test_mint_rejects_non_positive_ttl() {
        let user_id = Uuid::new_v4();
        assert_eq!(mint(user_id, SECRET, Duration::zero()), Err(AuthError::InvalidTtl));
        assert_eq!(
            mint(user_id, SECRET, Duration::seconds(-5)),
            Err(AuthError::InvalidTtl)
        );
    }

    #[test]
    fn test_oversized_ttl_is_invalid() {
        let user_id = Uuid::new_v4();
        assert_eq!(
            mint(user_id, SECRET, Duration::seconds(10_000_000_000_000)),
            Err(AuthError::InvalidTtl)
        );

        for secs in [10_000_000_000_000, u64::MAX] {
            let service = JwtService::new(Secret::new(SECRET.to_string()), secs);
            assert_eq!(service.issue(user_id), Err(AuthError::InvalidTtl));
        }

        assert!(ttl_from_secs(u64::MAX).is_none());
        assert_eq!(ttl_from_secs(90), Some(Duration::seconds(90)));
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let token = mint(Uuid::new_v4(), SECRET, Duration::minutes(5)).unwrap();
        assert_eq!(
            validate(&token, "another_secret_key_32_characters!!"),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_claims_are_stamped() {
        let user_id = Uuid::new_v4();
        let token = mint(user_id, SECRET, Duration::seconds(90)).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.iat, claims.nbf);
        assert_eq!(claims.exp - claims.iat, 90);
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp();
        let token = sign(
            &claims_for(&Uuid::new_v4().to_string(), now - 120, now - 60),
            SECRET,
        )
        .unwrap();

        assert_eq!(validate(&token, SECRET), Err(AuthError::Expired));
    }

    #[test]
    fn test_malformed_subject() {
        let now = Utc::now().timestamp();

        let empty = sign(&claims_for("", now, now + 60), SECRET).unwrap();
        assert_eq!(validate(&empty, SECRET), Err(AuthError::MalformedSubject));

        let garbage = sign(&claims_for("not-a-uuid", now, now + 60), SECRET).unwrap();
        assert_eq!(validate(&garbage, SECRET), Err(AuthError::MalformedSubject));
    }

    #[test]
    fn test_garbage_token() {
        assert_eq!(validate("invalid_token", SECRET), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_service_round_trip() {
        let service = JwtService::new(Secret::new(SECRET.to_string()), 900);
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id).unwrap();
        assert_eq!(service.verify(&token).unwrap(), user_id);
        assert_eq!(service.expires_in(), 900);
    }
}
