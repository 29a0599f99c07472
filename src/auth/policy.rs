//! Security policy: open endpoints, authorization guard and CORS

use axum::{
    extract::{Request, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE},
        HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use regex::RegexSet;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::middleware::get_auth_context, config::SecurityConfig, error::AppError};

/// Path patterns exempt from authentication.
///
/// `*` matches within one path segment, `**` matches any number of segments,
/// and a trailing `/**` also matches the bare prefix.
#[derive(Debug, Clone)]
pub struct OpenEndpoints {
    patterns: Vec<String>,
    matcher: RegexSet,
}

impl OpenEndpoints {
    pub fn new<I, S>(patterns: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let matcher = RegexSet::new(patterns.iter().map(|p| pattern_to_regex(p)))
            .map_err(|e| AppError::Config(format!("Invalid open endpoint pattern: {}", e)))?;

        Ok(Self { patterns, matcher })
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn pattern_to_regex(pattern: &str) -> String {
    let (body, tail) = match pattern.strip_suffix("/**") {
        Some(body) => (body, "(?:/.*)?"),
        None => (pattern, ""),
    };

    let mut regex = String::from("^");
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                regex.push_str(".*");
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push_str(tail);
    regex.push('$');
    regex
}

pub struct SecurityPolicy {
    open_endpoints: OpenEndpoints,
    allowed_origins: Vec<HeaderValue>,
}

impl SecurityPolicy {
    pub fn new(open_endpoints: OpenEndpoints, allowed_origins: Vec<HeaderValue>) -> Self {
        Self {
            open_endpoints,
            allowed_origins,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, AppError> {
        let open_endpoints = OpenEndpoints::new(security.open_endpoints.iter().cloned())?;

        let allowed_origins = security
            .allowed_origins
            .iter()
            .map(|origin| {
                // 携带凭证的 CORS 不允许通配来源
                if origin.trim() == "*" {
                    return Err(AppError::Config(
                        "Wildcard origin is not allowed with credentialed CORS".to_string(),
                    ));
                }
                HeaderValue::from_str(origin)
                    .map_err(|_| AppError::Config(format!("Invalid allowed origin: {}", origin)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(open_endpoints, allowed_origins))
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.open_endpoints.is_open(path)
    }

    pub fn open_endpoints(&self) -> &OpenEndpoints {
        &self.open_endpoints
    }

    /// Credentialed CORS for the configured origins, exposing `Set-Cookie`
    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.allowed_origins.clone()))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
            .expose_headers([SET_COOKIE])
    }
}

/// 授权中间件 - 非开放路径必须已认证
pub async fn require_authentication(
    State(policy): State<Arc<SecurityPolicy>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if policy.is_open(path) || get_auth_context(&req).is_some() {
        return Ok(next.run(req).await);
    }

    tracing::debug!(%path, "Unauthenticated request to protected path");
    Err(AppError::Unauthorized)
}
