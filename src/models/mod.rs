//! 数据模型模块
//! 用户与刷新令牌模型

pub mod auth;
pub mod user;
