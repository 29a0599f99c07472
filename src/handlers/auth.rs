//! 认证相关的 HTTP 处理器

use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        HeaderMap, HeaderValue, Uri,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::{
    auth::{
        cookie::{access_token_cookie, is_secure_request},
        middleware::{AuthContext, TOKEN_PREFIX},
    },
    config::TokenSource,
    error::AppError,
    middleware::AppState,
    models::auth::{IdentityResponse, LoginResponse},
};

/// 登录
///
/// 请求体按 type 字段解码；成功时令牌写入 access_token Cookie，
/// 失败时返回 401 且不设置 Cookie。
pub async fn login(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let issued = state.auth_service.login(&body).await?;

    let security = &state.config.security;
    let secure = is_secure_request(&uri, &headers, security.trust_proxy);

    let mut response = Json(LoginResponse {
        username: issued.claims.sub.clone(),
        expires_in: issued.max_age_secs,
    })
    .into_response();

    response.headers_mut().append(
        SET_COOKIE,
        access_token_cookie(&issued.token, secure, issued.max_age_secs)?,
    );

    // 仅 Header 模式的客户端拿不到 Cookie，需要在响应头中返回令牌
    if security.token_source == TokenSource::Header {
        let bearer = HeaderValue::from_str(&format!("{}{}", TOKEN_PREFIX, issued.token))
            .map_err(|_| AppError::Internal)?;
        response.headers_mut().insert(AUTHORIZATION, bearer);
    }

    Ok(response)
}

/// 获取当前用户信息
pub async fn current_user(auth_context: AuthContext) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        username: auth_context.username,
        authorities: auth_context.authorities,
    })
}
