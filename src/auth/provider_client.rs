//! Client for the external identity provider's token endpoint
//!
//! Used in external trust mode to exchange an email/password or a provider refresh token
//! for a provider-signed access token.

use crate::{auth::AuthError, config::AuthConfig};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tokens returned by the provider's token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

pub struct ProviderClient {
    base_url: String,
    api_key: Secret<String>,
    http_client: reqwest::Client,
}

impl ProviderClient {
    pub fn new(
        provider_url: &str,
        api_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Provider(format!("http client: {}", e)))?;

        Ok(Self {
            base_url: provider_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let provider_url = config
            .provider_url
            .as_deref()
            .ok_or_else(|| AuthError::Provider("provider url is not configured".into()))?;
        let api_key = config
            .provider_api_key
            .clone()
            .ok_or_else(|| AuthError::Provider("provider api key is not configured".into()))?;

        Self::new(
            provider_url,
            api_key,
            Duration::from_secs(config.jwks_timeout_secs),
        )
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderTokens, AuthError> {
        self.token_request("password", &PasswordGrant { email, password })
            .await
    }

    /// Exchange a provider refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, AuthError> {
        self.token_request("refresh_token", &RefreshGrant { refresh_token })
            .await
    }

    async fn token_request<B: Serialize>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<ProviderTokens, AuthError> {
        let url = format!("{}/auth/v1/token", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, grant_type, "Identity provider request failed");
                AuthError::Provider(e.to_string())
            })?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(status = %status, grant_type, "Identity provider rejected grant");
            return Err(AuthError::ProviderRejected);
        }
        if !status.is_success() {
            tracing::error!(status = %status, grant_type, "Identity provider returned error status");
            return Err(AuthError::Provider(format!("token endpoint returned {}", status)));
        }

        response.json::<ProviderTokens>().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse identity provider response");
            AuthError::Provider(format!("invalid token response: {}", e))
        })
    }
}
