use tokio::signal;
use tracing::{error, info};

/// 等待关闭信号
///
/// Resolves on Ctrl+C, or on SIGTERM on Unix. If a handler cannot be
/// installed the corresponding branch never fires; the other one still does.
pub async fn shutdown_signal() {
    // 监听 Ctrl+C 信号
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    // 在Unix系统上监听 SIGTERM 信号
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // 在非Unix系统上创建一个永不返回的future
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
