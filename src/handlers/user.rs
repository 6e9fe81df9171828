//! 用户相关的 HTTP 处理器

use crate::{auth::Identity, error::AppError, middleware::AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 当前调用方身份
pub async fn me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

/// 获取用户（仅限本人）
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::BadRequest("invalid user id".to_string()))?;

    if id != identity.user_id {
        tracing::debug!(caller = %identity.user_id, target = %id, "Ownership check failed");
        return Err(AppError::Forbidden);
    }

    let user = state.auth_service()?.get_user(id).await?;

    Ok(Json(user))
}
