//! Web 服务器入口点

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terabox_gateway::{config::Config, state::spawn_reload_task, web, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terabox_gateway=info,web_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 TeraBox 解析网关启动中...");

    // 加载配置（支持环境变量 CONFIG_PATH 或命令行参数）
    let config_path = std::env::var("CONFIG_PATH")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;
    if std::path::Path::new(&config_path).exists() {
        tracing::info!("✅ 配置加载完成: {}", config_path);
    } else {
        tracing::info!("✅ 配置文件不存在，使用默认值与环境变量");
    }

    let state = Arc::new(AppState::with_reload_path(config.clone(), &config_path)?);
    tracing::info!("✅ HTTP Client 初始化完成");

    let reload_secs = config.terabox.reload_interval_secs;
    if reload_secs > 0 {
        spawn_reload_task(state.clone(), Duration::from_secs(reload_secs));
        tracing::info!("🔄 每 {} 秒重新加载一次凭据", reload_secs);
    }

    let app = web::create_router(state);

    let addr = config.bind_addr();
    tracing::info!("🌐 Web 服务器启动在: http://{}", addr);
    tracing::info!("💚 健康检查: http://localhost:{}/health", config.web.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
