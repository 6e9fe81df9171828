//! HTTP 中间件与应用状态
//! 请求追踪、共享服务装配

use crate::{
    auth::{
        AuthProvider, ExternalIdentityValidator, ExternalOidc, JwksSettings, JwtService,
        LocalSigned, PasswordConfig, PasswordHasher, ProviderClient,
    },
    config::{AppConfig, TrustMode},
    error::AppError,
    repository::AuthStore,
    services::{AuthService, RefreshTokenService, SessionService},
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 信任模式在启动时确定：本地模式装配 AuthService，外部模式装配 SessionService
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn AuthStore>,
    pub auth_provider: Arc<dyn AuthProvider>,
    pub auth_service: Option<Arc<AuthService>>,
    pub session_service: Option<Arc<SessionService>>,
}

impl AppState {
    /// 根据配置装配服务
    ///
    /// 外部模式下会立即拉取 JWKS，失败即返回错误
    pub async fn build(config: AppConfig, store: Arc<dyn AuthStore>) -> Result<Self, AppError> {
        match config.auth.mode {
            TrustMode::Local => {
                let jwt_service = Arc::new(JwtService::from_config(&config));
                let hasher = Arc::new(PasswordHasher::new(PasswordConfig::from_security(
                    &config.security,
                ))?);
                let refresh_tokens = Arc::new(RefreshTokenService::new(
                    store.clone(),
                    config.security.refresh_token_exp_secs,
                    config.security.rotate_unusable_refresh_on_login,
                ));
                let auth_service = Arc::new(AuthService::new(
                    store.clone(),
                    jwt_service.clone(),
                    hasher,
                    refresh_tokens,
                ));

                Ok(Self {
                    config,
                    store,
                    auth_provider: Arc::new(LocalSigned::new(jwt_service)),
                    auth_service: Some(auth_service),
                    session_service: None,
                })
            }
            TrustMode::External => {
                let validator = Arc::new(
                    ExternalIdentityValidator::connect(JwksSettings::from_config(&config.auth)?)
                        .await?,
                );
                let client = ProviderClient::from_config(&config.auth)?;
                let session_service = Arc::new(SessionService::new(client, validator.clone()));

                Ok(Self {
                    config,
                    store,
                    auth_provider: Arc::new(ExternalOidc::new(validator)),
                    auth_service: None,
                    session_service: Some(session_service),
                })
            }
        }
    }

    pub fn auth_service(&self) -> Result<&Arc<AuthService>, AppError> {
        self.auth_service
            .as_ref()
            .ok_or_else(|| AppError::internal_error("local auth is not enabled"))
    }

    pub fn session_service(&self) -> Result<&Arc<SessionService>, AppError> {
        self.session_service
            .as_ref()
            .ok_or_else(|| AppError::internal_error("external auth is not enabled"))
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中添加 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }
}
