//! Trust paths for bearer tokens
//!
//! `LocalSigned` accepts session tokens this service minted itself; `ExternalOidc` accepts
//! tokens minted by the identity provider. Exactly one is selected at startup from
//! `auth.mode` and shared by every protected route.

use crate::{
    auth::{jwks::ExternalIdentityValidator, jwt::JwtService, AuthError, Identity},
    config::TrustMode,
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Trust mode this provider implements
    fn trust_mode(&self) -> TrustMode;

    /// Validate a raw bearer token and return the caller's identity.
    async fn validate(&self, token: &str) -> Result<Identity, AuthError>;
}

pub struct LocalSigned {
    jwt: Arc<JwtService>,
}

impl LocalSigned {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl AuthProvider for LocalSigned {
    fn trust_mode(&self) -> TrustMode {
        TrustMode::Local
    }

    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let user_id = self.jwt.verify(token)?;
        Ok(Identity {
            user_id,
            email: None,
            trust_mode: TrustMode::Local,
        })
    }
}

pub struct ExternalOidc {
    validator: Arc<ExternalIdentityValidator>,
}

impl ExternalOidc {
    pub fn new(validator: Arc<ExternalIdentityValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl AuthProvider for ExternalOidc {
    fn trust_mode(&self) -> TrustMode {
        TrustMode::External
    }

    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let session = self.validator.validate(token).await?;
        Ok(Identity {
            user_id: session.user_id,
            email: Some(session.email),
            trust_mode: TrustMode::External,
        })
    }
}
