//! 基于 JWT 的无状态认证层
//! 登录签发令牌、逐请求校验令牌，以及按类型标识解码多种用户表示

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod server;
pub mod services;
pub mod telemetry;
