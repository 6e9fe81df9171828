//! 认证相关的 HTTP 处理器

use crate::{
    auth::Identity,
    error::AppError,
    handlers::json_body,
    middleware::AppState,
    models::{
        auth::{LoginRequest, TokenRequest},
        user::RegisterRequest,
    },
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;

    let user = state.auth_service()?.register(req).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;

    let response = state.auth_service()?.login(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// 刷新访问令牌
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service()?.refresh(identity.user_id).await?;

    Ok(Json(response))
}

/// 撤销刷新令牌
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let record = state.auth_service()?.revoke(identity.user_id).await?;

    Ok(Json(record))
}

/// 向身份提供方换取会话（外部模式）
pub async fn token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;

    let session = state.session_service()?.exchange(req).await?;

    Ok(Json(session))
}
