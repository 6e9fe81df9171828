//! 统一错误模型
//! 定义应用错误类型及其 HTTP 映射

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(AuthError),

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MalformedHeader => AppError::BadRequest(e.to_string()),
            AuthError::WeakPassword | AuthError::InputTooLong => {
                AppError::Validation(e.to_string())
            }
            AuthError::ProviderRejected => AppError::Forbidden,
            e if e.is_internal() => AppError::Internal(e.to_string()),
            e => AppError::Unauthorized(e),
        }
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 客户端错误不记录敏感内容，服务端错误记录完整细节
        match &self {
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(code = self.code(), error = %self, "Application error");
            }
            AppError::Unauthorized(reason) => {
                metrics::counter!("auth_failures_total").increment(1);
                tracing::debug!(code = self.code(), reason = %reason, "Authentication rejected");
            }
            _ => {
                tracing::debug!(code = self.code(), error = %self, "Request rejected");
            }
        }

        status.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Unauthorized(AuthError::Expired).code(), 401);
        assert_eq!(AppError::Forbidden.code(), 403);
        assert_eq!(AppError::NotFound("test".to_string()).code(), 404);
        assert_eq!(AppError::BadRequest("test".to_string()).code(), 400);
        assert_eq!(AppError::Conflict("test".to_string()).code(), 409);
        assert_eq!(AppError::Database(sqlx::Error::RowNotFound).code(), 500);
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(AppError::from(AuthError::BadSignature).code(), 401);
        assert_eq!(AppError::from(AuthError::MissingHeader).code(), 401);
        assert_eq!(AppError::from(AuthError::MalformedHeader).code(), 400);
        assert_eq!(AppError::from(AuthError::WeakPassword).code(), 400);
        assert_eq!(
            AppError::from(AuthError::KeySetUnavailable("timeout".into())).code(),
            500
        );
    }
}
