//! HTTP 中间件
//! 应用状态与请求追踪

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{CredentialVerifier, JwtService, PasswordHasher, RequestAuthenticator, SecurityPolicy},
    config::AppConfig,
    error::AppError,
    models::PrincipalTypeRegistry,
    repository::UserStore,
    services::AuthService,
};

/// 应用状态
///
/// 启动时一次性构建，之后只读。类型注册表与签名密钥都在这里注入，
/// 不存在进程级可变全局状态。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<PrincipalTypeRegistry>,
    pub jwt_service: Arc<JwtService>,
    pub auth_service: Arc<AuthService>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub policy: Arc<SecurityPolicy>,
}

impl AppState {
    /// 构建应用状态
    ///
    /// 签名密钥或安全策略无效时返回配置错误，调用方应终止启动。
    pub fn build(
        config: AppConfig,
        registry: PrincipalTypeRegistry,
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
    ) -> Result<Arc<Self>, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let policy = Arc::new(SecurityPolicy::from_config(&config.security)?);

        if registry.is_empty() {
            tracing::warn!("No principal types registered, every login will be rejected");
        }
        let registry = Arc::new(registry);

        let credentials = Arc::new(CredentialVerifier::new(store, hasher)?);
        let auth_service = Arc::new(AuthService::new(
            registry.clone(),
            credentials,
            jwt_service.clone(),
        ));
        let authenticator = Arc::new(RequestAuthenticator::from_config(
            jwt_service.clone(),
            &config.security,
        ));

        tracing::info!(
            principal_types = ?registry.discriminators(),
            token_source = ?config.security.token_source,
            open_endpoints = ?policy.open_endpoints().patterns(),
            "Security state initialized"
        );

        Ok(Arc::new(Self {
            config,
            registry,
            jwt_service,
            auth_service,
            authenticator,
            policy,
        }))
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 指标标签使用静态字符串
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            "OPTIONS" => "OPTIONS",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
