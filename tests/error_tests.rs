//! 错误处理单元测试
//!
//! 测试应用错误类型的状态码映射与响应体

use axum::{http::StatusCode, response::IntoResponse};
use http_body_util::BodyExt;
use unsubtle_core::{auth::AuthError, error::AppError};

// ==================== 错误状态码测试 ====================

#[test]
fn test_error_status_codes() {
    assert_eq!(
        AppError::Unauthorized(AuthError::BadSignature).status_code(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::NotFound("resource".to_string()).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::BadRequest("invalid".to_string()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Validation("error".to_string()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Conflict("dup".to_string()).status_code(), StatusCode::CONFLICT);
    assert_eq!(
        AppError::Database(sqlx::Error::RowNotFound).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AppError::Config("Invalid config".to_string()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// ==================== AuthError 映射测试 ====================

#[test]
fn test_auth_error_conversion() {
    let cases = [
        (AuthError::Expired, StatusCode::UNAUTHORIZED),
        (AuthError::MalformedSubject, StatusCode::UNAUTHORIZED),
        (AuthError::MissingClaim("email"), StatusCode::UNAUTHORIZED),
        (AuthError::UnknownKey, StatusCode::UNAUTHORIZED),
        (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        (AuthError::MalformedHeader, StatusCode::BAD_REQUEST),
        (AuthError::InputTooLong, StatusCode::BAD_REQUEST),
        (AuthError::WeakPassword, StatusCode::BAD_REQUEST),
        (AuthError::ProviderRejected, StatusCode::FORBIDDEN),
        (AuthError::InvalidTtl, StatusCode::INTERNAL_SERVER_ERROR),
        (AuthError::Hashing("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AuthError::MissingIdentity, StatusCode::INTERNAL_SERVER_ERROR),
        (
            AuthError::KeySetUnavailable("timeout".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        let label = err.to_string();
        assert_eq!(AppError::from(err).status_code(), expected, "{label}");
    }
}

// ==================== 响应体测试 ====================

#[tokio::test]
async fn test_error_response_has_empty_body() {
    for err in [
        AppError::Unauthorized(AuthError::Expired),
        AppError::Conflict("email is already registered".to_string()),
        AppError::Internal("database password=hunter2".to_string()),
    ] {
        let status = err.status_code();
        let response = err.into_response();
        assert_eq!(response.status(), status);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }
}
