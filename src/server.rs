//! 服务启动与优雅关闭

use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;

/// 启动服务，收到关闭信号后等待在途请求完成
///
/// 排空超过 `drain_timeout` 时不再等待，直接返回。
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let draining = Arc::new(Notify::new());

    let notify = draining.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            notify.notify_one();
        })
        .into_future();

    let deadline = async {
        draining.notified().await;
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        result = server => result,
        _ = deadline => {
            tracing::warn!(
                timeout_secs = drain_timeout.as_secs_f64(),
                "Graceful shutdown timeout reached, forcing exit"
            );
            Ok(())
        }
    }
}

/// 优雅关闭信号处理
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }
}
