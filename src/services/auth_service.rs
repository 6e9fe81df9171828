//! 认证服务：注册、登录、令牌刷新、撤销

use crate::{
    auth::{AuthError, JwtService, PasswordHasher},
    error::AppError,
    models::{
        auth::{LoginRequest, LoginResponse, RefreshResponse, RefreshToken},
        user::{NewUser, RegisterRequest, UserResponse},
    },
    repository::AuthStore,
    services::RefreshTokenService,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct AuthService {
    store: Arc<dyn AuthStore>,
    jwt_service: Arc<JwtService>,
    hasher: Arc<PasswordHasher>,
    refresh_tokens: Arc<RefreshTokenService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        jwt_service: Arc<JwtService>,
        hasher: Arc<PasswordHasher>,
        refresh_tokens: Arc<RefreshTokenService>,
    ) -> Self {
        Self {
            store,
            jwt_service,
            hasher,
            refresh_tokens,
        }
    }

    /// 用户注册
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AppError> {
        req.validate()
            .map_err(|e| AppError::Validation(format!("invalid email: {}", e)))?;

        if self.store.get_user_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict("email is already registered".to_string()));
        }

        // 熵检查在哈希之前
        self.hasher.check_entropy(&req.password)?;

        let hasher = self.hasher.clone();
        let password = req.password;
        let hashed_password = tokio::task::spawn_blocking(move || hasher.create_hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))??;

        let user = self
            .store
            .create_user(NewUser {
                email: req.email,
                hashed_password,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(UserResponse::from(user))
    }

    /// 用户登录
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let user = self
            .store
            .get_user_by_email(&req.email)
            .await?
            .ok_or(AppError::Unauthorized(AuthError::InvalidCredentials))?;

        // 验证密码
        let hasher = self.hasher.clone();
        let password = req.password;
        let hash = user.hashed_password.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.is_valid(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))?;

        if !valid {
            tracing::debug!(user_id = %user.id, "Login rejected: invalid password");
            return Err(AppError::Unauthorized(AuthError::InvalidCredentials));
        }

        // 生成访问令牌
        let token = self.jwt_service.issue(user.id)?;

        // 获取或创建刷新令牌
        let refresh_token = self.refresh_tokens.ensure_for_login(user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
            token,
            refresh_token: refresh_token.token,
        })
    }

    /// 刷新访问令牌（刷新令牌本身不轮换）
    pub async fn refresh(&self, user_id: Uuid) -> Result<RefreshResponse, AppError> {
        self.refresh_tokens.authorize_refresh(user_id).await?;

        let token = self.jwt_service.issue(user_id)?;

        Ok(RefreshResponse { token })
    }

    /// 撤销刷新令牌
    pub async fn revoke(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        self.refresh_tokens.revoke(user_id).await
    }

    /// 根据 ID 获取用户
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, AppError> {
        self.store
            .get_user_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::not_found("user"))
    }
}
