//! 路由注册
//! 按信任模式创建 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{auth::auth_middleware, config::TrustMode, handlers, middleware::AppState};

/// 请求体大小上限
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_layer =
        axum::middleware::from_fn_with_state(state.auth_provider.clone(), auth_middleware);

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    let (credential_routes, session_routes) = match state.config.auth.mode {
        TrustMode::Local => (
            // 无需认证
            Router::new()
                .route("/register", post(handlers::auth::register))
                .route("/login", post(handlers::auth::login)),
            // 需要本地会话令牌
            Router::new()
                .route("/refresh", post(handlers::auth::refresh))
                .route("/revoke", post(handlers::auth::revoke))
                .route("/api/users/{id}", get(handlers::user::get_user)),
        ),
        TrustMode::External => (
            Router::new().route("/token", post(handlers::auth::token)),
            Router::new(),
        ),
    };

    // 需要认证的路由（route_layer: 未匹配的路径仍返回 404）
    let authenticated_routes = session_routes
        .route("/api/me", get(handlers::user::me))
        .route_layer(auth_layer);

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(credential_routes)
        .merge(authenticated_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
