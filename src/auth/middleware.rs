//! JWT 认证中间件
//! 每个请求提取并校验令牌，成功时把认证上下文附加到请求扩展

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::{
    auth::{
        cookie::{clear_access_token_cookie, read_cookie, ACCESS_TOKEN_COOKIE},
        jwt::JwtService,
    },
    config::{SecurityConfig, TokenSource},
    error::AppError,
};

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const TOKEN_PREFIX: &str = "Bearer ";

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub username: String,
    pub authorities: Vec<String>,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 单次认证结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// 令牌有效
    Authenticated(AuthContext),
    /// 未携带令牌
    Anonymous,
    /// 携带了令牌但校验失败
    Rejected,
}

/// 从 Authorization 头提取令牌
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix(TOKEN_PREFIX))
        .map(|token| token.trim().to_string())
}

/// 按部署形态提取令牌
///
/// Cookie 模式：非空的 access_token Cookie 优先，否则回退到 Authorization 头。
/// Header 模式：只看 Authorization 头。
pub fn extract_token(headers: &HeaderMap, source: TokenSource) -> Option<String> {
    if source == TokenSource::Cookie {
        if let Some(token) = read_cookie(headers, ACCESS_TOKEN_COOKIE).filter(|t| !t.is_empty()) {
            return Some(token);
        }
    }

    extract_bearer_token(headers)
}

/// 请求认证器
pub struct RequestAuthenticator {
    jwt_service: Arc<JwtService>,
    source: TokenSource,
    propagate_roles: bool,
}

impl RequestAuthenticator {
    pub fn new(jwt_service: Arc<JwtService>, source: TokenSource, propagate_roles: bool) -> Self {
        Self {
            jwt_service,
            source,
            propagate_roles,
        }
    }

    pub fn from_config(jwt_service: Arc<JwtService>, security: &SecurityConfig) -> Self {
        Self::new(jwt_service, security.token_source, security.propagate_roles)
    }

    pub fn source(&self) -> TokenSource {
        self.source
    }

    /// 校验失败时是否下发清除 Cookie 指令（仅 Cookie 模式）
    pub fn clears_cookie_on_failure(&self) -> bool {
        self.source == TokenSource::Cookie
    }

    /// 认证一次请求，不做重试
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(token) = extract_token(headers, self.source) else {
            return AuthOutcome::Anonymous;
        };

        match self.jwt_service.verify(&token) {
            Ok(claims) => {
                // 默认不还原角色，权限列表为空
                let authorities = if self.propagate_roles {
                    claims.role_list()
                } else {
                    Vec::new()
                };

                AuthOutcome::Authenticated(AuthContext {
                    username: claims.sub,
                    authorities,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, source = ?self.source, "Rejected access token");
                metrics::counter!("auth_token_rejected_total").increment(1);
                AuthOutcome::Rejected
            }
        }
    }
}

/// 令牌认证中间件 - 不强制要求认证，是否放行由授权层决定
pub async fn token_auth_middleware(
    State(authenticator): State<Arc<RequestAuthenticator>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 不允许任何上游残留的身份进入下游
    req.extensions_mut().remove::<AuthContext>();

    match authenticator.authenticate(req.headers()) {
        AuthOutcome::Authenticated(auth_context) => {
            tracing::debug!(username = %auth_context.username, "Request authenticated");
            req.extensions_mut().insert(auth_context);
            next.run(req).await
        }
        AuthOutcome::Anonymous => next.run(req).await,
        AuthOutcome::Rejected => {
            let mut response = next.run(req).await;
            if authenticator.clears_cookie_on_failure() {
                response
                    .headers_mut()
                    .append(SET_COOKIE, clear_access_token_cookie());
            }
            response
        }
    }
}

/// 从扩展中提取 AuthContext 的辅助函数
pub fn get_auth_context(req: &Request) -> Option<AuthContext> {
    req.extensions().get::<AuthContext>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::SigningKey;
    use crate::models::{PrincipalId, StandardUser};
    use axum::http::header::COOKIE;

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(SigningKey::from_bytes(&[9u8; 64]).unwrap(), 3600))
    }

    fn token_for(jwt: &JwtService, username: &str) -> String {
        let user = StandardUser::new(
            PrincipalId::Number(1),
            username,
            "hash",
            vec!["ADMIN".to_string(), "USER".to_string()],
        );
        jwt.issue(&user).unwrap().token
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("test_token_123"));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_none());

        assert!(extract_bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_cookie_takes_precedence_in_cookie_mode() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "access_token=from-cookie".parse().unwrap());
        headers.insert("authorization", "Bearer from-header".parse().unwrap());

        assert_eq!(extract_token(&headers, TokenSource::Cookie).as_deref(), Some("from-cookie"));
        assert_eq!(extract_token(&headers, TokenSource::Header).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_empty_cookie_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "access_token=".parse().unwrap());
        headers.insert("authorization", "Bearer from-header".parse().unwrap());

        assert_eq!(extract_token(&headers, TokenSource::Cookie).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_authenticate_outcomes() {
        let jwt = jwt();
        let authenticator = RequestAuthenticator::new(jwt.clone(), TokenSource::Cookie, false);

        assert_eq!(authenticator.authenticate(&HeaderMap::new()), AuthOutcome::Anonymous);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("access_token={}", token_for(&jwt, "ana")).parse().unwrap());
        assert_eq!(
            authenticator.authenticate(&headers),
            AuthOutcome::Authenticated(AuthContext {
                username: "ana".to_string(),
                authorities: vec![],
            })
        );

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer Bearer not-a-jwt".parse().unwrap());
        assert_eq!(authenticator.authenticate(&headers), AuthOutcome::Rejected);
    }

    #[test]
    fn test_roles_propagated_when_enabled() {
        let jwt = jwt();
        let authenticator = RequestAuthenticator::new(jwt.clone(), TokenSource::Header, true);

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token_for(&jwt, "ana")).parse().unwrap(),
        );

        match authenticator.authenticate(&headers) {
            AuthOutcome::Authenticated(ctx) => assert_eq!(ctx.authorities, vec!["ADMIN", "USER"]),
            other => panic!("expected Authenticated, got {:?}", other),
        }
    }
    #[test]
    fn test_cookie_clearing_follows_token_source() {
        let cookie_mode = RequestAuthenticator::new(jwt(), TokenSource::Cookie, false);
        assert_eq!(cookie_mode.source(), TokenSource::Cookie);
        assert!(cookie_mode.clears_cookie_on_failure());

        let header_mode = RequestAuthenticator::new(jwt(), TokenSource::Header, false);
        assert_eq!(header_mode.source(), TokenSource::Header);
        assert!(!header_mode.clears_cookie_on_failure());
    }
}
