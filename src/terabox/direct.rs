//! 直链解析：对 dlink 发 HEAD 请求（不跟随重定向），读取 Location

use futures_util::stream::{self, StreamExt};
use reqwest::{header::LOCATION, Client};
use tracing::{debug, info, warn};

use super::client::TeraboxClient;
use super::format::direct_link_file;
use super::types::{DirectLinkFile, RawFileRecord};

impl TeraboxClient {
    /// 批量解析直链，结果顺序与输入一致
    ///
    /// 单个文件解析失败只会让该文件的 `direct_link` 为空，不影响其它文件。
    pub async fn resolve_direct_links(&self, files: &[RawFileRecord]) -> Vec<DirectLinkFile> {
        info!(
            "🔗 解析 {} 个文件的直链（并发 {}）...",
            files.len(),
            self.config.direct_link_concurrency
        );

        let session = match self.session() {
            Ok(session) => session,
            Err(e) => {
                warn!("⚠️ 创建上游会话失败: {}", e);
                return files.iter().map(|f| direct_link_file(f, None)).collect();
            }
        };
        let head_client = &session.head_client;

        let results: Vec<DirectLinkFile> = stream::iter(files.iter().cloned())
            .map(|file| resolve_file(head_client, file))
            .buffered(self.config.direct_link_concurrency)
            .collect()
            .await;

        let resolved = results.iter().filter(|f| f.direct_link.is_some()).count();
        info!("✅ 成功解析 {}/{} 个直链", resolved, results.len());
        results
    }

    /// 解析单个 dlink 的跳转地址
    pub async fn resolve_direct_link(&self, dlink: &str) -> Option<String> {
        if dlink.is_empty() {
            return None;
        }
        match self.session() {
            Ok(session) => head_location(&session.head_client, dlink).await,
            Err(e) => {
                warn!("⚠️ 创建上游会话失败: {}", e);
                None
            }
        }
    }
}

async fn resolve_file(head_client: &Client, file: RawFileRecord) -> DirectLinkFile {
    let direct_link = match file.dlink() {
        "" => None,
        dlink => head_location(head_client, dlink).await,
    };
    direct_link_file(&file, direct_link)
}

async fn head_location(head_client: &Client, dlink: &str) -> Option<String> {
    let resp = match head_client.head(dlink).send().await {
        Ok(resp) => resp,
        Err(e) => {
            warn!("⚠️ 获取直链失败: {}", e);
            return None;
        }
    };

    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if location.is_none() {
        debug!("📨 HEAD {} 未返回 Location (status={})", dlink, resp.status());
    }
    location
}
