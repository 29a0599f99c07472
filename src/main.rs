//! 认证服务主入口

use axum::Router;
use jwt_guard::{
    auth::{PasswordHasher, SigningKey},
    config::{AppConfig, Profile},
    middleware::AppState,
    models::{PrincipalId, PrincipalTypeRegistry, StandardUser, STANDARD_USER_TYPE},
    repository::{EmptyUserStore, InMemoryUserStore, UserStore},
    routes, server, telemetry,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("jwt-guard {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            "--generate-key" => {
                println!("{}", SigningKey::generate_base64());
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env.development > .env
    if let Ok(env) = std::env::var("AUTH_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    // 1. 加载配置（签名密钥无效时在此终止）
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "jwt-guard starting...");

    // 3. 注册用户类型（必须在接收请求之前完成）
    let mut registry = PrincipalTypeRegistry::new();
    registry.register::<StandardUser>(STANDARD_USER_TYPE);

    // 4. 用户存储
    let store = build_user_store(&config);

    // 5. 构建应用状态
    let app_state = AppState::build(config.clone(), registry, store, PasswordHasher::new())?;

    // 6. 构建路由
    let app = routes::create_router(app_state, Router::new());

    // 7. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 8. 优雅关闭，排空超时后强制退出
    server::serve(
        listener,
        app,
        server::shutdown_signal(),
        Duration::from_secs(config.server.graceful_shutdown_timeout_secs),
    )
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 构建用户存储
/// build 环境使用空存储，其余环境使用内存存储并写入可选的初始用户
fn build_user_store(config: &AppConfig) -> Arc<dyn UserStore> {
    if config.profile == Profile::Build {
        return Arc::new(EmptyUserStore);
    }

    let mut store = InMemoryUserStore::new();
    if let Some(bootstrap) = &config.bootstrap {
        store.insert(Arc::new(StandardUser::new(
            PrincipalId::Number(1),
            bootstrap.username.clone(),
            bootstrap.password_hash.expose_secret().clone(),
            bootstrap.roles.iter().cloned(),
        )));
        tracing::info!(username = %bootstrap.username, "Bootstrap user registered");
    }

    Arc::new(store)
}

/// 打印帮助信息
fn print_help() {
    println!("jwt-guard {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: jwt-guard [选项]");
    println!();
    println!("选项:");
    println!("  --version        打印版本信息并退出");
    println!("  --help           打印此帮助信息并退出");
    println!("  --generate-key   生成随机 512 位签名密钥（Base64）并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 AUTH_ 前缀的环境变量完成，例如:");
    println!("  AUTH_PROFILE=production");
    println!("  AUTH_SECURITY__SECRET_KEY=<base64 key>");
    println!("  AUTH_SECURITY__OPEN_ENDPOINTS=/login,/health");
    println!("  AUTH_SECURITY__ALLOWED_ORIGINS=https://app.example.com");
}
