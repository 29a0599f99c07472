//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;

use crate::auth::jwt::SigningKey;

/// 未配置签名密钥时使用的占位值，只允许在 test/build 环境下启动
pub const PLACEHOLDER_SECRET_KEY: &str =
    "INVALIDSECRETKEYINVALIDSECRETKEYINVALIDSECRETKEYINVALIDSECRETKEYINVALIDSECRETKEYINVALIDSECRETKEY";

/// 运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Production,
    Development,
    Test,
    Build,
}

impl Profile {
    /// test/build 环境允许占位密钥
    pub fn allows_placeholder_key(&self) -> bool {
        matches!(self, Profile::Test | Profile::Build)
    }
}

/// 令牌来源（两种部署形态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    /// 优先读取 access_token Cookie，其次 Authorization 头；校验失败时清除 Cookie
    Cookie,
    /// 仅读取 Authorization 头，不下发清除 Cookie 指令
    Header,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:8080"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 签名密钥，Base64 编码（使用 Secret 包装，防止日志泄露）
    pub secret_key: Secret<String>,
    /// 令牌有效期（秒）
    pub token_expiration_secs: u64,
    /// 令牌来源
    pub token_source: TokenSource,
    /// 是否把 roles 声明还原为权限列表
    pub propagate_roles: bool,
    /// 是否信任 X-Forwarded-Proto 头
    pub trust_proxy: bool,
    /// 免认证路径模式
    pub open_endpoints: Vec<String>,
    /// CORS 允许的来源
    pub allowed_origins: Vec<String>,
}

/// 启动时写入内存用户存储的初始用户（可选）
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapUserConfig {
    pub username: String,
    /// PHC 格式的 Argon2 哈希
    pub password_hash: Secret<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub profile: Profile,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub bootstrap: Option<BootstrapUserConfig>,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("profile", "production")?
            .set_default("server.addr", "0.0.0.0:8080")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.secret_key", PLACEHOLDER_SECRET_KEY)?
            .set_default("security.token_expiration_secs", 86400)?
            .set_default("security.token_source", "cookie")?
            .set_default("security.propagate_roles", false)?
            .set_default("security.trust_proxy", false)?
            .set_default("security.open_endpoints", vec!["/login", "/health"])?
            .set_default("security.allowed_origins", Vec::<String>::new())?;

        // 从环境变量加载配置（前缀为 AUTH_），列表值以逗号分隔
        settings = settings.add_source(
            Environment::with_prefix("AUTH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("security.open_endpoints")
                .with_list_parse_key("security.allowed_origins")
                .with_list_parse_key("bootstrap.roles")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证令牌过期时间
        if self.security.token_expiration_secs < 60 || self.security.token_expiration_secs > 86400 {
            return Err(ConfigError::Message(
                "token_expiration_secs must be between 60 and 86400 (1 minute to 24 hours)"
                    .to_string(),
            ));
        }

        // 签名密钥无效时必须阻止启动
        SigningKey::from_config(&self.security, self.profile)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(())
    }
}
