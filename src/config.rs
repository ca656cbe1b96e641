//! 配置文件加载

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub terabox: TeraboxConfig,
    #[serde(default)] // 如果配置文件没有 [web] 就用默认值
    pub web: WebConfig,
}

/// 上游 TeraBox 相关配置（Cookie 需要定期从浏览器更新）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeraboxConfig {
    /// 分享列表接口地址
    #[serde(default = "default_list_url")]
    pub list_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// /api2 解析直链时的最大并发 HEAD 请求数
    #[serde(default = "default_direct_link_concurrency")]
    pub direct_link_concurrency: usize,
    /// 凭据重新加载间隔（秒），0 表示不自动重载
    #[serde(default)]
    pub reload_interval_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// 每次请求都会带上的固定 Cookie，不区分主机
    #[serde(default = "default_cookies")]
    pub cookies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for TeraboxConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
            http_timeout_secs: default_http_timeout_secs(),
            direct_link_concurrency: default_direct_link_concurrency(),
            reload_interval_secs: 0,
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            cookies: default_cookies(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_list_url() -> String {
    "https://www.terabox.app/share/list".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_direct_link_concurrency() -> usize {
    8
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_cookies() -> BTreeMap<String, String> {
    // 只有非敏感的默认值，ndus / csrfToken 等必须由配置或环境变量提供
    BTreeMap::from([
        ("PANWEB".to_string(), "1".to_string()),
        ("lang".to_string(), "en".to_string()),
    ])
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// 读取 TOML 配置；文件不存在时使用默认值，随后应用环境变量覆盖
    pub fn load(path: &str) -> Result<Self> {
        let content = if Path::new(path).exists() {
            fs::read_to_string(path).with_context(|| format!("读取配置文件失败: {}", path))?
        } else {
            String::new()
        };
        let mut config: Config =
            toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 环境变量覆盖：HOST / PORT / TERABOX_COOKIE / TERABOX_LIST_URL
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            self.web.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.web.port = port;
        }
        if let Some(list_url) = lookup("TERABOX_LIST_URL").filter(|u| !u.is_empty()) {
            self.terabox.list_url = list_url;
        }
        if let Some(raw) = lookup("TERABOX_COOKIE") {
            self.terabox.cookies.extend(parse_cookie_header(&raw));
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}

/// 解析浏览器复制出来的 `a=b; c=d` 形式 Cookie
pub fn parse_cookie_header(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
