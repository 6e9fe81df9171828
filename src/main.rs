//! 服务主入口

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use unsubtle_core::{
    config::AppConfig, db, handlers::health, middleware::AppState, routes, telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("unsubtle-core {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
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
    // 生产环境应该直接设置环境变量
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?config.auth.mode,
        "Service starting..."
    );

    // 3. 存储
    let store = db::create_store(&config.database).await?;

    // 4. 构建应用状态（外部模式下拉取 JWKS，失败即退出）
    let app_state = Arc::new(AppState::build(config.clone(), store).await?);
    tracing::info!(
        trust_mode = ?app_state.auth_provider.trust_mode(),
        "Auth provider ready"
    );

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    let shutdown_timeout = config.server.graceful_shutdown_timeout_secs;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 收到信号后开始排空请求；超时仍未完成则强制退出
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("unsubtle-core {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: unsubtle-core [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量 (前缀 UNSUBTLE_, 嵌套分隔符 __):");
    println!("  UNSUBTLE_DATABASE__URL             PostgreSQL 连接 URL");
    println!("  UNSUBTLE_DATABASE__IN_MEMORY       使用进程内存储 (true/false)");
    println!("  UNSUBTLE_SECURITY__JWT_SECRET      会话令牌签名密钥 (本地模式, >= 32 字符)");
    println!("  UNSUBTLE_AUTH__MODE                local | external");
    println!("  UNSUBTLE_AUTH__PROVIDER_URL        身份提供方 URL (外部模式)");
    println!("  UNSUBTLE_AUTH__PROVIDER_API_KEY    身份提供方 API Key (外部模式)");
}
