//! PostgreSQL store (数据库访问层)

use super::AuthStore;
use crate::{
    error::AppError,
    models::{
        auth::{NewRefreshToken, RefreshToken},
        user::{NewUser, User},
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgAuthStore {
    db: PgPool,
}

impl PgAuthStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

/// 唯一约束冲突转换为 Conflict
fn conflict_on_unique(e: sqlx::Error, what: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    /// 根据邮箱查找用户
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 根据 ID 查找用户
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 创建用户
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.hashed_password)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token, expires_at, revoked_at, created_at, updated_at
            FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(token)
    }

    async fn create_refresh_token(&self, token: NewRefreshToken) -> Result<RefreshToken, AppError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token, expires_at, revoked_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "refresh token"))
    }

    async fn update_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<Option<RefreshToken>, AppError> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            UPDATE refresh_tokens
            SET
                token = $2,
                expires_at = $3,
                revoked_at = NULL,
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, token, expires_at, revoked_at, created_at, updated_at
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// 撤销刷新令牌（幂等，保留首次撤销时间）
    async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            UPDATE refresh_tokens
            SET
                revoked_at = COALESCE(revoked_at, NOW()),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, token, expires_at, revoked_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
