//! 测试公共模块
//! 提供测试配置、应用构建与请求辅助函数

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use unsubtle_core::{
    config::{
        AppConfig, AuthConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig,
        TrustMode,
    },
    middleware::AppState,
    repository::MemoryAuthStore,
    routes,
};

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";
pub const TEST_EMAIL: &str = "ben@example.com";
pub const TEST_PASSWORD: &str = "Syp9393-Syp9292-Syp9191";

/// 创建测试配置（进程内存储，低成本哈希参数）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: Secret::new(String::new()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
            in_memory: true,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
            access_token_exp_secs: 300,
            refresh_token_exp_secs: 3600,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            max_password_bytes: 72,
            min_password_length: 12,
            password_alphabet_size: 89,
            rotate_unusable_refresh_on_login: false,
        },
        auth: AuthConfig {
            mode: TrustMode::Local,
            provider_url: None,
            provider_api_key: None,
            allowed_algorithms: vec!["ES256".to_string()],
            clock_skew_secs: 60,
            jwks_timeout_secs: 5,
            jwks_cache_ttl_secs: 3600,
            jwks_min_refresh_secs: 0,
        },
    }
}

/// 外部模式测试配置，身份提供方指向 mock 服务
pub fn create_external_test_config(provider_url: &str) -> AppConfig {
    let mut config = create_test_config();
    config.auth.mode = TrustMode::External;
    config.auth.provider_url = Some(provider_url.to_string());
    config.auth.provider_api_key = Some(Secret::new("anon-key".to_string()));
    config
}

/// 创建测试应用
pub async fn create_test_app(config: AppConfig) -> Router {
    let state = AppState::build(config, Arc::new(MemoryAuthStore::new()))
        .await
        .expect("Failed to build app state");
    routes::create_router(Arc::new(state))
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn send_with_bearer(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// 注册并登录测试用户，返回登录响应
pub async fn register_and_login(app: &Router) -> Value {
    let credentials = serde_json::json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD });

    let response = post_json(app, "/register", credentials.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(app, "/login", credentials).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    body_json(response).await
}
