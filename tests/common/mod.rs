//! 测试公共模块
//! 提供测试配置、测试用户类型和应用构建辅助函数

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    response::Response,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDateTime;
use http_body_util::BodyExt;
use jwt_guard::{
    auth::{cookie::set_cookie_values, AuthContext, PasswordHasher},
    config::{AppConfig, LoggingConfig, Profile, SecurityConfig, ServerConfig, TokenSource},
    middleware::AppState,
    models::{Principal, PrincipalId, PrincipalTypeRegistry, StandardUser, STANDARD_USER_TYPE},
    repository::{InMemoryUserStore, StoreError, UserStore},
    routes,
};
use secrecy::Secret;
use serde::Deserialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 测试用的用户类型标识
pub const TEST_USER_TYPE: &str = "TestUser";

/// 明文密码 "password"
pub const PLAIN_PASSWORD: &str = "password";

/// 测试签名密钥（64 字节，Base64）
pub fn test_secret_key() -> String {
    STANDARD.encode([42u8; 64])
}

/// 创建测试配置
pub fn create_test_config(token_source: TokenSource) -> AppConfig {
    AppConfig {
        profile: Profile::Test,
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            secret_key: Secret::new(test_secret_key()),
            token_expiration_secs: 3600,
            token_source,
            propagate_roles: false,
            trust_proxy: false,
            open_endpoints: vec!["/login".to_string(), "/health".to_string()],
            allowed_origins: vec!["https://app.example.com".to_string()],
        },
        bootstrap: None,
    }
}

/// 与 StandardUser 字段布局不同的用户表示：单一 role 字段
#[derive(Debug, Clone, Deserialize)]
pub struct TestUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Principal for TestUser {
    fn id(&self) -> PrincipalId {
        PrincipalId::Text(format!("test-{}", self.username))
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }

    fn roles(&self) -> BTreeSet<String> {
        self.role.iter().cloned().collect()
    }

    fn created_at(&self) -> Option<NaiveDateTime> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 永远失败的存储
pub struct FailingStore;

#[async_trait]
impl UserStore for FailingStore {
    async fn find_by_username(
        &self,
        _username: &str,
    ) -> Result<Option<Arc<dyn Principal>>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// 使用低成本参数的哈希器，避免测试过慢
pub fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_params(1024, 1, 1).expect("Failed to create hasher")
}

/// 创建测试用户存储
///
/// - `user`：TestUser，角色 ADMIN
/// - `ana`：StandardUser，角色 USER、AUDITOR
/// - `nobody`：StandardUser，无角色
pub fn create_test_store() -> InMemoryUserStore {
    let hash = fast_hasher()
        .hash(PLAIN_PASSWORD.as_bytes())
        .expect("Failed to hash password");

    let mut store = InMemoryUserStore::new();
    store
        .insert(Arc::new(TestUser {
            username: "user".to_string(),
            password: hash.clone(),
            role: Some("ADMIN".to_string()),
        }))
        .insert(Arc::new(StandardUser::new(
            PrincipalId::Number(7),
            "ana",
            hash.clone(),
            vec!["USER".to_string(), "AUDITOR".to_string()],
        )))
        .insert(Arc::new(StandardUser::new(
            PrincipalId::Number(8),
            "nobody",
            hash,
            Vec::new(),
        )));
    store
}

pub fn create_test_registry() -> PrincipalTypeRegistry {
    let mut registry = PrincipalTypeRegistry::new();
    registry
        .register::<StandardUser>(STANDARD_USER_TYPE)
        .register::<TestUser>(TEST_USER_TYPE);
    registry
}

/// 下游业务路由：返回当前认证用户名
async fn list_orders(auth: AuthContext) -> String {
    format!("orders for {}", auth.username)
}

pub fn downstream_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/orders", get(list_orders))
}

/// 创建测试应用
pub fn create_test_app(config: AppConfig) -> (Router, Arc<AppState>) {
    create_test_app_with_store(config, Arc::new(create_test_store()))
}

pub fn create_test_app_with_store(
    config: AppConfig,
    store: Arc<dyn UserStore>,
) -> (Router, Arc<AppState>) {
    let state = AppState::build(config, create_test_registry(), store, fast_hasher())
        .expect("Failed to build app state");
    let router = routes::create_router(state.clone(), downstream_routes());
    (router, state)
}

/// 构建登录请求
pub fn login_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// TestUser 登录请求体
pub fn test_user_login(username: &str, plain_password: &str) -> serde_json::Value {
    serde_json::json!({
        "type": TEST_USER_TYPE,
        "username": username,
        "password": STANDARD.encode(plain_password),
    })
}

/// 带 Cookie 的 GET 请求
pub fn get_with_cookie(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("access_token={}", token))
        .body(Body::empty())
        .unwrap()
}

/// 带 Authorization 头的 GET 请求
pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// 从响应中取出 access_token Cookie 的值
pub fn access_token_from(headers: &HeaderMap) -> Option<String> {
    set_cookie_values(headers).into_iter().find_map(|cookie| {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.trim().strip_prefix("access_token="))
            .map(str::to_string)
    })
}

/// 响应是否带有清除 Cookie 指令
pub fn has_clear_cookie(headers: &HeaderMap) -> bool {
    set_cookie_values(headers)
        .iter()
        .any(|cookie| cookie.starts_with("access_token=;") && cookie.contains("Max-Age=0"))
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
