//! Provider-backed sessions (external trust mode)

use crate::{
    auth::{ExternalIdentityValidator, ProviderClient, ProviderTokens, Session},
    error::AppError,
    models::auth::TokenRequest,
};
use std::sync::Arc;

pub struct SessionService {
    client: ProviderClient,
    validator: Arc<ExternalIdentityValidator>,
}

impl SessionService {
    pub fn new(client: ProviderClient, validator: Arc<ExternalIdentityValidator>) -> Self {
        Self { client, validator }
    }

    /// Exchange a token request with the provider and validate what comes back.
    pub async fn exchange(&self, req: TokenRequest) -> Result<Session, AppError> {
        let tokens = match req {
            TokenRequest::Password { email, password } => {
                self.client.sign_in_with_password(&email, &password).await?
            }
            TokenRequest::RefreshToken { refresh_token } => {
                self.client.refresh(&refresh_token).await?
            }
        };

        self.session_from(tokens).await
    }

    async fn session_from(&self, tokens: ProviderTokens) -> Result<Session, AppError> {
        // The provider's own token must pass the same checks as any bearer token
        let session = self
            .validator
            .validate(&tokens.access_token)
            .await
            .map_err(|e| {
                if e.is_internal() {
                    AppError::from(e)
                } else {
                    tracing::error!(error = %e, "Provider issued a token that fails validation");
                    AppError::Internal(format!("provider token rejected: {}", e))
                }
            })?;

        tracing::info!(user_id = %session.user_id, "Provider session established");

        Ok(session.with_refresh_token(tokens.refresh_token))
    }
}
