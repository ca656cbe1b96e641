//! 上游 HTTP 客户端（Cookie + 浏览器请求头）

use anyhow::{anyhow, Result};
use reqwest::{
    cookie::{CookieStore, Jar},
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    redirect::Policy,
    Client, Url,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{parse_cookie_header, TeraboxConfig};

/// 持有上游访问所需的静态配置（Cookie、请求头、超时）
///
/// 本身不保存任何会话状态，每次解析通过 [`TeraboxClient::session`] 开启新会话。
pub struct TeraboxClient {
    pub config: TeraboxConfig,
    headers: HeaderMap,
    timeout: Duration,
}

/// 单次解析的上游会话
///
/// `client` 跟随重定向（分享页），`head_client` 不跟随（解析直链时读取 Location）。
/// 两者共用同一个 [`SessionCookies`]，会话内收到的 Set-Cookie 只对本会话可见。
pub struct UpstreamSession {
    pub client: Client,
    pub head_client: Client,
}

/// 会话 Cookie：配置中的固定 Cookie 发往任意主机，叠加本会话收到的 Set-Cookie
pub struct SessionCookies {
    fixed: BTreeMap<String, String>,
    jar: Jar,
}

impl SessionCookies {
    pub fn new(fixed: &BTreeMap<String, String>) -> Self {
        Self {
            fixed: fixed
                .iter()
                .filter(|(name, value)| !name.is_empty() && !value.is_empty())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            jar: Jar::default(),
        }
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar.set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let mut merged = self.fixed.clone();
        // 上游下发的同名 Cookie 覆盖配置值
        if let Some(received) = self.jar.cookies(url) {
            if let Ok(raw) = received.to_str() {
                merged.extend(parse_cookie_header(raw));
            }
        }
        if merged.is_empty() {
            return None;
        }

        let header = merged
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}

impl TeraboxClient {
    pub fn new(config: TeraboxConfig) -> Result<Self> {
        if config.direct_link_concurrency == 0 {
            return Err(anyhow!("direct_link_concurrency 必须大于 0"));
        }
        config
            .list_url
            .parse::<Url>()
            .map_err(|e| anyhow!("list_url 无效: {} ({})", config.list_url, e))?;

        if !config.cookies.contains_key("ndus") {
            warn!("⚠️ 未配置 ndus Cookie，上游很可能拒绝请求");
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);

        let client = Self {
            timeout: Duration::from_secs(config.http_timeout_secs),
            config,
            headers,
        };
        // 提前构建一次，尽早暴露 TLS 等构建错误
        client.session()?;
        Ok(client)
    }

    /// 开启一个新的上游会话，Cookie 仅在本会话内累积
    pub fn session(&self) -> Result<UpstreamSession, reqwest::Error> {
        let cookies = Arc::new(SessionCookies::new(&self.config.cookies));

        let client = Client::builder()
            .cookie_provider(cookies.clone())
            .default_headers(self.headers.clone())
            .timeout(self.timeout)
            .build()?;

        let head_client = Client::builder()
            .cookie_provider(cookies)
            .default_headers(self.headers.clone())
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()?;

        Ok(UpstreamSession {
            client,
            head_client,
        })
    }
}
