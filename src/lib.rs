//! 订阅追踪后端的认证与会话核心
//! 会话令牌、刷新令牌、密码校验与外部身份提供方令牌校验

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
