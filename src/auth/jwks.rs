//! Validation of tokens signed by the external identity provider
//!
//! The provider publishes its public keys as a JSON Web Key Set. The set is fetched once
//! when the validator is built and then served from an in-memory cache. Readers only
//! clone an `Arc` under the read lock. Once the cache outlives its TTL a single background
//! task re-downloads the set while readers keep using the old one; only a token naming a
//! key the cache does not hold waits for a fetch. Fetch attempts, failed ones included,
//! are spaced at least `min_refresh_interval` apart.

use crate::{
    auth::{AuthError, Session},
    config::AuthConfig,
};
use chrono::Utc;
use jsonwebtoken::{
    decode, decode_header,
    errors::ErrorKind,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Path of the key set below the provider's base URL
pub const JWKS_PATH: &str = "/auth/v1/.well-known/jwks.json";

/// Settings for [`ExternalIdentityValidator`]
#[derive(Debug, Clone)]
pub struct JwksSettings {
    pub provider_url: String,
    pub allowed_algorithms: Vec<String>,
    pub clock_skew_secs: u64,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub min_refresh_interval: Duration,
}

impl JwksSettings {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let provider_url = config
            .provider_url
            .clone()
            .ok_or_else(|| AuthError::KeySetUnavailable("provider url is not configured".into()))?;

        Ok(Self {
            provider_url,
            allowed_algorithms: config.allowed_algorithms.clone(),
            clock_skew_secs: config.clock_skew_secs,
            request_timeout: Duration::from_secs(config.jwks_timeout_secs),
            cache_ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
            min_refresh_interval: Duration::from_secs(config.jwks_min_refresh_secs),
        })
    }
}

/// Derive the well-known key set URL from the provider's base URL.
pub fn jwks_url(provider_url: &str) -> Result<reqwest::Url, AuthError> {
    let base = reqwest::Url::parse(provider_url.trim_end_matches('/'))
        .map_err(|e| AuthError::KeySetUnavailable(format!("invalid provider url: {}", e)))?;

    if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
        return Err(AuthError::KeySetUnavailable(format!(
            "invalid provider url: {}",
            provider_url
        )));
    }

    reqwest::Url::parse(&format!("{}{}", base.as_str().trim_end_matches('/'), JWKS_PATH))
        .map_err(|e| AuthError::KeySetUnavailable(format!("invalid jwks url: {}", e)))
}

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Where the key set comes from, plus the currently cached copy
struct KeySource {
    jwks_url: reqwest::Url,
    http_client: reqwest::Client,
    cache: RwLock<Arc<CachedKeySet>>,
}

impl KeySource {
    async fn snapshot(&self) -> Arc<CachedKeySet> {
        self.cache.read().await.clone()
    }

    /// Download the set and swap it in. The cache keeps its old value on failure.
    async fn reload(&self) -> Result<Arc<CachedKeySet>, AuthError> {
        let keys = fetch_key_set(&self.http_client, &self.jwks_url).await?;
        let fresh = Arc::new(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        });

        *self.cache.write().await = fresh.clone();
        tracing::info!(keys = fresh.keys.keys.len(), "JWKS cache refreshed");

        Ok(fresh)
    }
}

/// Validates provider-issued tokens against the provider's published key set
pub struct ExternalIdentityValidator {
    allowed_algorithms: Vec<Algorithm>,
    clock_skew_secs: i64,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    source: Arc<KeySource>,
    /// Held for the duration of a fetch; stores when the last fetch started, successful or not
    last_attempt: Arc<Mutex<Instant>>,
}

impl ExternalIdentityValidator {
    /// Build the validator and fetch the key set. Fails when the URL is malformed, the
    /// key set cannot be downloaded or parsed, or the algorithm allowlist is invalid.
    pub async fn connect(settings: JwksSettings) -> Result<Self, AuthError> {
        let jwks_url = jwks_url(&settings.provider_url)?;
        let allowed_algorithms = parse_allowlist(&settings.allowed_algorithms)?;

        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AuthError::KeySetUnavailable(format!("http client: {}", e)))?;

        tracing::info!(jwks_url = %jwks_url, "Using JWKS uri");

        let started = Instant::now();
        let keys = fetch_key_set(&http_client, &jwks_url).await?;
        tracing::info!(keys = keys.keys.len(), "JWKS loaded");

        Ok(Self {
            allowed_algorithms,
            clock_skew_secs: settings.clock_skew_secs as i64,
            cache_ttl: settings.cache_ttl,
            min_refresh_interval: settings.min_refresh_interval,
            source: Arc::new(KeySource {
                jwks_url,
                http_client,
                cache: RwLock::new(Arc::new(CachedKeySet {
                    keys,
                    fetched_at: Instant::now(),
                })),
            }),
            last_attempt: Arc::new(Mutex::new(started)),
        })
    }

    /// Verify a provider token and extract the session it describes.
    pub async fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        if !self.allowed_algorithms.contains(&header.alg) {
            tracing::debug!(alg = ?header.alg, "Token algorithm not in allowlist");
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let jwk = self.find_key(header.kid.as_deref()).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| {
            tracing::debug!("Unusable JWK: {:?}", e);
            AuthError::UnknownKey
        })?;

        // Time-based claims are checked below with the provider's skew rules
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let claims = decode::<HashMap<String, Value>>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    AuthError::UnsupportedAlgorithm
                }
                _ => AuthError::MalformedToken,
            })?
            .claims;

        session_from_claims(token, &claims, Utc::now().timestamp(), self.clock_skew_secs)
    }

    /// Force a re-download of the key set, ignoring the refresh throttle.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let mut last_attempt = self.last_attempt.lock().await;
        *last_attempt = Instant::now();
        self.source.reload().await.map(|_| ())
    }

    /// Number of keys currently cached
    pub async fn cached_key_count(&self) -> usize {
        self.source.snapshot().await.keys.keys.len()
    }

    /// The cached set, even when stale. A stale set schedules a background refresh.
    async fn current(&self) -> Arc<CachedKeySet> {
        let cached = self.source.snapshot().await;
        if cached.fetched_at.elapsed() >= self.cache_ttl {
            self.spawn_refresh();
        }
        cached
    }

    fn spawn_refresh(&self) {
        // A fetch is already running
        let Ok(mut last_attempt) = self.last_attempt.clone().try_lock_owned() else {
            return;
        };
        if last_attempt.elapsed() < self.min_refresh_interval {
            return;
        }
        *last_attempt = Instant::now();

        let source = self.source.clone();
        tokio::spawn(async move {
            let _last_attempt = last_attempt;
            if let Err(e) = source.reload().await {
                tracing::warn!(error = %e, "Background JWKS refresh failed, serving cached keys");
            }
        });
    }

    async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        let cached = self.current().await;
        if let Some(jwk) = select_key(&cached.keys, kid) {
            return Ok(jwk.clone());
        }

        // Unknown kid: the provider may have rotated its keys
        if kid.is_none() {
            return Err(AuthError::UnknownKey);
        }

        let refreshed = self.refresh_after(&cached).await?;
        select_key(&refreshed.keys, kid)
            .cloned()
            .ok_or(AuthError::UnknownKey)
    }

    /// A set newer than `seen`: waits for a fetch in flight, otherwise starts one unless
    /// the last attempt was within `min_refresh_interval`.
    async fn refresh_after(&self, seen: &Arc<CachedKeySet>) -> Result<Arc<CachedKeySet>, AuthError> {
        let mut last_attempt = self.last_attempt.lock().await;

        let current = self.source.snapshot().await;
        if !Arc::ptr_eq(&current, seen) || last_attempt.elapsed() < self.min_refresh_interval {
            return Ok(current);
        }

        *last_attempt = Instant::now();
        self.source.reload().await
    }
}

fn parse_allowlist(names: &[String]) -> Result<Vec<Algorithm>, AuthError> {
    if names.is_empty() {
        return Err(AuthError::UnsupportedAlgorithm);
    }

    names
        .iter()
        .map(|name| {
            let alg = Algorithm::from_str(name.trim()).map_err(|_| AuthError::UnsupportedAlgorithm)?;
            // Shared-secret algorithms make no sense against a public key set
            if matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
                return Err(AuthError::UnsupportedAlgorithm);
            }
            Ok(alg)
        })
        .collect()
}

fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None => keys.keys.first(),
    }
}

async fn fetch_key_set(client: &reqwest::Client, url: &reqwest::Url) -> Result<JwkSet, AuthError> {
    tracing::debug!(jwks_url = %url, "Fetching JWKS");

    let response = client.get(url.clone()).send().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch JWKS");
        AuthError::KeySetUnavailable(format!("Failed to fetch JWKS: {}", e))
    })?;

    if !response.status().is_success() {
        tracing::error!(status = %response.status(), "JWKS fetch returned error status");
        return Err(AuthError::KeySetUnavailable(format!(
            "JWKS fetch returned status: {}",
            response.status()
        )));
    }

    response.json::<JwkSet>().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse JWKS");
        AuthError::KeySetUnavailable(format!("Failed to parse JWKS: {}", e))
    })
}

/// Apply the time checks and pull the identity claims out of a verified token.
fn session_from_claims(
    token: &str,
    claims: &HashMap<String, Value>,
    now: i64,
    clock_skew_secs: i64,
) -> Result<Session, AuthError> {
    let issued_at = claims
        .get("iat")
        .and_then(Value::as_i64)
        .ok_or(AuthError::MissingClaim("iat"))?;
    let expires_at = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(AuthError::MissingClaim("exp"))?;

    if issued_at - clock_skew_secs >= now {
        return Err(AuthError::IssuedInFuture);
    }

    if expires_at <= now {
        return Err(AuthError::Expired);
    }

    let email = claims
        .get("email")
        .and_then(Value::as_str)
        .ok_or(AuthError::MissingClaim("email"))?;

    let user_id = claims
        .get("sub")
        .and_then(Value::as_str)
        .and_then(|sub| Uuid::parse_str(sub).ok())
        .ok_or(AuthError::MissingClaim("sub"))?;

    Ok(Session {
        access_token: token.to_string(),
        refresh_token: None,
        email: email.to_string(),
        user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_jwks_url() {
        assert_eq!(
            jwks_url("https://project.example.co").unwrap().as_str(),
            "https://project.example.co/auth/v1/.well-known/jwks.json"
        );
        assert_eq!(
            jwks_url("https://project.example.co/").unwrap().as_str(),
            "https://project.example.co/auth/v1/.well-known/jwks.json"
        );
        assert!(jwks_url("not a url").is_err());
        assert!(jwks_url("ftp://project.example.co").is_err());
    }

    #[test]
    fn test_allowlist() {
        assert_eq!(
            parse_allowlist(&["ES256".to_string()]).unwrap(),
            vec![Algorithm::ES256]
        );
        assert!(parse_allowlist(&["HS256".to_string()]).is_err());
        assert!(parse_allowlist(&["none".to_string()]).is_err());
        assert!(parse_allowlist(&[]).is_err());
    }

    #[test]
    fn test_session_from_claims() {
        let user_id = Uuid::new_v4();
        let now = 1_700_000_000;
        let session = session_from_claims(
            "tok",
            &claims(json!({
                "sub": user_id.to_string(),
                "email": "ben@example.com",
                "iat": now - 10,
                "exp": now + 3600,
            })),
            now,
            60,
        )
        .unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.email, "ben@example.com");
        assert_eq!(session.access_token, "tok");
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn test_clock_skew() {
        let now = 1_700_000_000;
        let sub = Uuid::new_v4().to_string();
        let at = |iat: i64| {
            session_from_claims(
                "tok",
                &claims(json!({"sub": sub, "email": "a@b.c", "iat": iat, "exp": now + 600})),
                now,
                60,
            )
        };

        assert!(at(now + 30).is_ok());
        assert!(at(now + 59).is_ok());
        assert_eq!(at(now + 60).unwrap_err(), AuthError::IssuedInFuture);
        assert_eq!(at(now + 600).unwrap_err(), AuthError::IssuedInFuture);
    }

    #[test]
    fn test_expired_and_missing_claims() {
        let now = 1_700_000_000;
        let sub = Uuid::new_v4().to_string();

        let expired = claims(json!({"sub": sub, "email": "a@b.c", "iat": now - 100, "exp": now}));
        assert_eq!(
            session_from_claims("t", &expired, now, 60).unwrap_err(),
            AuthError::Expired
        );

        let no_email = claims(json!({"sub": sub, "iat": now, "exp": now + 10}));
        assert_eq!(
            session_from_claims("t", &no_email, now, 60).unwrap_err(),
            AuthError::MissingClaim("email")
        );

        let bad_sub = claims(json!({"sub": "abc", "email": "a@b.c", "iat": now, "exp": now + 10}));
        assert_eq!(
            session_from_claims("t", &bad_sub, now, 60).unwrap_err(),
            AuthError::MissingClaim("sub")
        );

        let numeric_email = claims(json!({"sub": sub, "email": 42, "iat": now, "exp": now + 10}));
        assert_eq!(
            session_from_claims("t", &numeric_email, now, 60).unwrap_err(),
            AuthError::MissingClaim("email")
        );

        let no_exp = claims(json!({"sub": sub, "email": "a@b.c", "iat": now}));
        assert_eq!(
            session_from_claims("t", &no_exp, now, 60).unwrap_err(),
            AuthError::MissingClaim("exp")
        );
    }
}
