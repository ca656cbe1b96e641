//! 应用状态：当前上游客户端 + 凭据热重载

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::Config;
use crate::terabox::TeraboxClient;

pub struct AppState {
    /// 配置文件路径；为空时只使用传入的配置，不支持重载
    config_path: Option<String>,
    upstream: RwLock<Arc<TeraboxClient>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let upstream = TeraboxClient::new(config.terabox)?;
        Ok(Self {
            config_path: None,
            upstream: RwLock::new(Arc::new(upstream)),
        })
    }

    /// 记住配置文件路径，之后可以通过 [`AppState::reload`] 重新读取 Cookie
    pub fn with_reload_path(config: Config, path: &str) -> Result<Self> {
        let mut state = Self::new(config)?;
        state.config_path = Some(path.to_string());
        Ok(state)
    }

    /// 当前上游客户端；正在处理的请求持有旧的 Arc，不受重载影响
    pub async fn upstream(&self) -> Arc<TeraboxClient> {
        self.upstream.read().await.clone()
    }

    /// 重新读取配置并替换上游客户端，返回是否实际发生了重载
    pub async fn reload(&self) -> Result<bool> {
        let Some(path) = &self.config_path else {
            return Ok(false);
        };
        let config = Config::load(path)?;
        let client = Arc::new(TeraboxClient::new(config.terabox)?);
        *self.upstream.write().await = client;
        info!("🔄 已重新加载上游凭据: {}", path);
        Ok(true)
    }

    pub async fn set_upstream(&self, client: TeraboxClient) {
        *self.upstream.write().await = Arc::new(client);
    }
}

/// 按固定间隔重载凭据（Cookie 会过期，需要从外部定期轮换）
pub fn spawn_reload_task(state: Arc<AppState>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // 第一次 tick 立即返回，跳过
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = state.reload().await {
                error!("❌ 重新加载凭据失败，继续使用旧凭据: {:#}", e);
            }
        }
    })
}
