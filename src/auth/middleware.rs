//! 认证中间件
//! 提取 Bearer 令牌，交由当前信任模式校验，并把调用方身份写入请求扩展

use crate::{
    auth::{bearer::extract_bearer, provider::AuthProvider, AuthError},
    config::TrustMode,
    error::AppError,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Extensions},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated caller, visible to downstream handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip)]
    pub trust_mode: TrustMode,
}

/// 请求扩展中的私有键，外部只能通过下面两个函数读写
#[derive(Clone)]
struct IdentityKey(Identity);

/// 写入调用方身份
pub fn with_identity(extensions: &mut Extensions, identity: Identity) {
    extensions.insert(IdentityKey(identity));
}

/// 读取调用方身份
pub fn identity_from(extensions: &Extensions) -> Result<&Identity, AuthError> {
    extensions
        .get::<IdentityKey>()
        .map(|key| &key.0)
        .ok_or(AuthError::MissingIdentity)
}

// 在 handler 中直接提取 Identity
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from(&parts.extensions)
            .cloned()
            .map_err(AppError::from)
    }
}

/// 认证中间件 - 必须认证
///
/// 令牌缺失或无效返回 401；密钥集不可用返回 500
pub async fn auth_middleware(
    State(provider): State<Arc<dyn AuthProvider>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(req.headers()).map_err(AppError::Unauthorized)?;

    let identity = provider.validate(&token).await.map_err(|e| {
        if e.is_internal() {
            AppError::from(e)
        } else {
            AppError::Unauthorized(e)
        }
    })?;

    tracing::debug!(
        user_id = %identity.user_id,
        trust_mode = ?identity.trust_mode,
        "Request authenticated"
    );

    with_identity(req.extensions_mut(), identity);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accessors() {
        let mut extensions = Extensions::new();
        assert_eq!(
            identity_from(&extensions).unwrap_err(),
            AuthError::MissingIdentity
        );

        let identity = Identity {
            user_id: Uuid::new_v4(),
            email: Some("ben@example.com".to_string()),
            trust_mode: TrustMode::External,
        };
        with_identity(&mut extensions, identity.clone());

        assert_eq!(identity_from(&extensions).unwrap(), &identity);
    }

    #[test]
    fn test_bare_identity_is_not_visible() {
        // Only values inserted through with_identity count
        let mut extensions = Extensions::new();
        extensions.insert(Identity {
            user_id: Uuid::new_v4(),
            email: None,
            trust_mode: TrustMode::Local,
        });

        assert!(identity_from(&extensions).is_err());
    }
}
