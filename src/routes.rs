//! 路由注册
//! 创建 API 路由并按顺序应用认证中间件
//!
//! 请求处理顺序（由外到内）：
//! 请求追踪 → CORS → 令牌认证 → 授权检查 → 处理器
//!
//! /login 不经过令牌认证，签发令牌的请求不会校验它自己签发的令牌。

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{
    auth::{middleware::token_auth_middleware, policy::require_authentication},
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// 创建应用路由
///
/// `app_routes` 为下游业务路由，与内置路由一起受认证与授权保护。
pub fn create_router(state: Arc<AppState>, app_routes: Router<Arc<AppState>>) -> Router {
    // 登录端点
    let login_routes = Router::new().route("/login", post(handlers::auth::login));

    // 受保护路由（开放路径由授权层放行）
    let guarded_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/me", get(handlers::auth::current_user))
        .merge(app_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.policy.clone(),
            require_authentication,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.authenticator.clone(),
            token_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(login_routes)
        .merge(guarded_routes)
        .layer(state.policy.cors_layer())
        .layer(axum::middleware::from_fn(request_tracking_middleware))
        .with_state(state)
}
