//! 分享链接文件列表获取
//!
//! 分享页 -> share/list -> （首项为目录时）目录列表，三步严格顺序执行，不做重试。

use reqwest::{header::REFERER, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::client::TeraboxClient;
use super::error::ShareError;
use super::parser::{extract_surl, extract_tokens, ShareTokens};
use super::types::{RawFileRecord, ShareListing};
use super::ERRNO_VERIFICATION_REQUIRED;

const APP_ID: &str = "250528";
const CHANNEL: &str = "dubox";
const CLIENT_TYPE: &str = "0";
const PAGE_SIZE: &str = "20";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default = "unknown_errno")]
    errno: i64,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default)]
    list: Option<Vec<Value>>,
}

fn unknown_errno() -> i64 {
    -1
}

/// 一次 list 请求的结果
enum ListPage {
    Files(Vec<RawFileRecord>),
    VerificationRequired,
    MissingList,
}

impl TeraboxClient {
    /// 获取分享链接中的文件列表
    ///
    /// `password` 目前只记录日志，不会发送给上游。
    pub async fn fetch_share_listing(
        &self,
        url: &str,
        password: &str,
    ) -> Result<ShareListing, ShareError> {
        info!("🌐 访问分享页面: {}", url);
        if !password.is_empty() {
            debug!("🔐 收到提取码参数（暂不提交给上游）");
        }

        // 每次解析使用独立会话，Set-Cookie 只在本次的三步之间生效
        let session = self.session()?;
        let client = &session.client;

        // Step 1: 访问分享页，记录重定向后的地址
        let resp = client.get(url).send().await?.error_for_status()?;
        let resolved_url = resp.url().to_string();
        let html = resp.text().await?;
        debug!("📄 页面长度: {} 字节, 最终地址: {}", html.len(), resolved_url);

        // Step 2: 提取令牌和 surl
        let tokens = extract_tokens(&html).inspect_err(|_| {
            error!("❌ 无法从分享页提取令牌，页面格式可能已变化");
        })?;
        let surl = extract_surl(&resolved_url).inspect_err(|_| {
            error!("❌ 无法从地址中提取 surl: {}", resolved_url);
        })?;
        info!("✅ 提取到 surl={}, logid={}", surl, tokens.log_id);

        // Step 3: 获取根目录列表
        let root_params = root_list_params(&tokens, &resolved_url, &surl);
        let files = match self.fetch_list_page(client, &root_params, &resolved_url).await? {
            ListPage::Files(files) => files,
            ListPage::VerificationRequired => {
                warn!("🔒 分享链接需要验证: surl={}", surl);
                return Ok(ShareListing::VerificationRequired { surl });
            }
            ListPage::MissingList => {
                error!("❌ list 响应中没有文件列表");
                return Err(ShareError::NoFileList);
            }
        };
        info!("📦 找到 {} 个条目", files.len());

        // Step 4: 首项是目录时只展开这一层
        let Some(dir) = files.first().filter(|f| f.isdir) else {
            return Ok(ShareListing::Files(files));
        };

        info!("📁 获取目录内容: {}", dir.path());
        let dir_params = directory_list_params(&root_params, dir.path());
        match self.fetch_list_page(client, &dir_params, &resolved_url).await? {
            ListPage::Files(children) => {
                info!("📦 目录中找到 {} 个文件", children.len());
                Ok(ShareListing::Files(children))
            }
            ListPage::VerificationRequired => {
                warn!("🔒 目录列表需要验证: surl={}", surl);
                Ok(ShareListing::VerificationRequired { surl })
            }
            ListPage::MissingList => {
                error!("❌ 目录列表响应中没有文件列表");
                Err(ShareError::NoDirectoryList)
            }
        }
    }

    async fn fetch_list_page(
        &self,
        client: &Client,
        params: &[(&'static str, String)],
        referer: &str,
    ) -> Result<ListPage, ShareError> {
        debug!("📡 调用 list API: {}", self.config.list_url);

        let text = client
            .get(&self.config.list_url)
            .query(params)
            .header(REFERER, referer)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!("📨 list 响应: {}", text.chars().take(200).collect::<String>());

        let res: ListResponse = serde_json::from_str(&text)?;
        parse_list_response(res)
    }
}

fn parse_list_response(res: ListResponse) -> Result<ListPage, ShareError> {
    if res.errno == ERRNO_VERIFICATION_REQUIRED {
        return Ok(ListPage::VerificationRequired);
    }

    if res.errno != 0 {
        let message = res.errmsg.unwrap_or_else(|| "Unknown error".to_string());
        error!("❌ list API errno={}: {}", res.errno, message);
        return Err(ShareError::UpstreamApi {
            errno: res.errno,
            message,
        });
    }

    let Some(list) = res.list else {
        return Ok(ListPage::MissingList);
    };

    let files = list
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                warn!("⚠️ 跳过非对象条目: {}", item);
                return None;
            }
            Some(RawFileRecord::from_value(item))
        })
        .collect();

    Ok(ListPage::Files(files))
}

fn root_list_params(
    tokens: &ShareTokens,
    referer: &str,
    surl: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("app_id", APP_ID.to_string()),
        ("web", "1".to_string()),
        ("channel", CHANNEL.to_string()),
        ("clienttype", CLIENT_TYPE.to_string()),
        ("jsToken", tokens.js_token.clone()),
        ("dplogid", tokens.log_id.clone()),
        ("page", "1".to_string()),
        ("num", PAGE_SIZE.to_string()),
        ("order", "time".to_string()),
        ("desc", "1".to_string()),
        ("site_referer", referer.to_string()),
        ("shorturl", surl.to_string()),
        ("root", "1".to_string()),
    ]
}

/// 目录列表参数：按名称升序，去掉 desc / root
fn directory_list_params(
    root: &[(&'static str, String)],
    dir: &str,
) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = root
        .iter()
        .filter(|(key, _)| !matches!(*key, "desc" | "root"))
        .map(|(key, value)| match *key {
            "order" => (*key, "asc".to_string()),
            _ => (*key, value.clone()),
        })
        .collect();
    params.push(("dir", dir.to_string()));
    params.push(("by", "name".to_string()));
    params
}
