//! 刷新令牌服务：创建、复用、撤销与刷新授权
//!
//! 每个用户最多一条刷新令牌记录。状态机：Active -> Revoked（终态），
//! Expired 在读取时根据 expires_at 推导。

use crate::{
    auth::{jwt::ttl_from_secs, AuthError},
    error::AppError,
    models::auth::{NewRefreshToken, RefreshToken},
    repository::AuthStore,
};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use uuid::Uuid;

/// 刷新令牌随机字节数（256 位，hex 编码后 64 字符）
const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate an opaque refresh token: 32 random bytes, lowercase hex.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct RefreshTokenService {
    store: Arc<dyn AuthStore>,
    ttl: Duration,
    rotate_unusable_on_login: bool,
}

impl RefreshTokenService {
    pub fn new(store: Arc<dyn AuthStore>, ttl_secs: u64, rotate_unusable_on_login: bool) -> Self {
        Self {
            store,
            ttl: ttl_from_secs(ttl_secs).unwrap_or_else(Duration::zero),
            rotate_unusable_on_login,
        }
    }

    /// 获取用户的刷新令牌记录
    pub async fn get_for_user(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        self.store
            .get_refresh_token(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("refresh token"))
    }

    /// 创建刷新令牌
    ///
    /// 已有可用记录时原样返回；已撤销或已过期的记录原地替换
    pub async fn create_for_user(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<RefreshToken, AppError> {
        if ttl <= Duration::zero() {
            return Err(AuthError::InvalidTtl.into());
        }

        let now = Utc::now();
        let existing = self.store.get_refresh_token(user_id).await?;

        if let Some(record) = &existing {
            if record.is_usable(now) {
                return Ok(record.clone());
            }
        }

        let expires_at = now.checked_add_signed(ttl).ok_or(AuthError::InvalidTtl)?;
        let fresh = NewRefreshToken {
            user_id,
            token: generate_refresh_token(),
            expires_at,
        };

        if existing.is_some() {
            tracing::info!(%user_id, "Replacing unusable refresh token");
            return self
                .store
                .update_refresh_token(fresh)
                .await?
                .ok_or_else(|| AppError::not_found("refresh token"));
        }

        match self.store.create_refresh_token(fresh).await {
            Ok(record) => {
                tracing::info!(%user_id, "Refresh token created");
                Ok(record)
            }
            // 并发登录时另一请求已创建记录
            Err(AppError::Conflict(_)) => self.get_for_user(user_id).await,
            Err(e) => Err(e),
        }
    }

    /// 撤销刷新令牌（幂等）
    pub async fn revoke(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        let record = self
            .store
            .revoke_refresh_token(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("refresh token"))?;

        tracing::info!(%user_id, "Refresh token revoked");
        Ok(record)
    }

    /// 登录时获取刷新令牌
    ///
    /// 没有记录时创建；已有记录时默认原样复用，即便已撤销或过期。
    /// 开启 rotate_unusable_on_login 后，不可用的记录会被替换。
    pub async fn ensure_for_login(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        match self.store.get_refresh_token(user_id).await? {
            None => self.create_for_user(user_id, self.ttl).await,
            Some(record) if record.is_usable(Utc::now()) => Ok(record),
            Some(_) if self.rotate_unusable_on_login => {
                self.create_for_user(user_id, self.ttl).await
            }
            Some(record) => {
                tracing::warn!(
                    %user_id,
                    revoked = record.is_revoked(),
                    "Login reused an unusable refresh token"
                );
                Ok(record)
            }
        }
    }

    /// 刷新授权：记录缺失、已撤销或已过期时返回 Forbidden
    pub async fn authorize_refresh(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        let record = self
            .store
            .get_refresh_token(user_id)
            .await?
            .ok_or(AppError::Forbidden)?;

        if !record.is_usable(Utc::now()) {
            tracing::debug!(%user_id, revoked = record.is_revoked(), "Refresh denied");
            return Err(AppError::Forbidden);
        }

        Ok(record)
    }
}
