//! HTTP 处理器模块

pub mod auth;
pub mod health;
pub mod user;

use crate::error::AppError;
use axum::{extract::rejection::JsonRejection, Json};

/// 请求体解析失败统一返回 400
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}
