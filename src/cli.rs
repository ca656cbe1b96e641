//! 命令行客户端：本地解析，或调用已部署的网关
//!
//! 未指定 `--base` 时依次查找可执行文件旁和当前目录下的 `apiurl.txt`；
//! 都没有（或地址为 `local`）时在本进程内直接解析。

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const API_URL_FILE: &str = "apiurl.txt";

#[derive(Parser, Debug)]
#[command(name = "terabox-gateway", about = "TeraBox 分享链接解析", version)]
pub struct Cli {
    /// 分享链接，省略时交互输入
    pub share_url: Option<String>,
    /// 使用的接口：api（文件信息）或 api2（解析直链）
    #[arg(long, value_enum, default_value_t = Mode::Api)]
    pub mode: Mode,
    /// 提取码
    #[arg(long, default_value = "")]
    pub pwd: String,
    /// 远程网关地址，`local` 表示本地解析
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Api,
    Api2,
}

impl Mode {
    pub fn endpoint(self) -> &'static str {
        match self {
            Mode::Api => "/api",
            Mode::Api2 => "/api2",
        }
    }
}

/// apiurl.txt 的候选位置：可执行文件所在目录、当前目录
pub fn api_url_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(API_URL_FILE));
    }
    paths.push(PathBuf::from(API_URL_FILE));
    paths
}

/// 决定远程网关地址；返回 None 表示本地解析
pub fn resolve_base(explicit: Option<&str>, candidates: &[PathBuf]) -> Option<String> {
    let base = match explicit {
        Some(base) => Some(base.trim().to_string()),
        None => candidates.iter().find_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            debug!("📄 从 {} 读取网关地址", path.display());
            Some(content.to_string())
        }),
    }?;

    let base = base.trim_end_matches('/');
    if base.is_empty() || base.eq_ignore_ascii_case("local") {
        return None;
    }
    Some(base.to_string())
}

pub fn build_api_url(base: &str, mode: Mode) -> String {
    format!("{}{}", base.trim_end_matches('/'), mode.endpoint())
}

/// 从网关响应中取出第一个可用链接
///
/// 兼容旧版 `{"success":true,"downloadLink":..}`、`{"link":..}` 以及 `files[0]`。
pub fn extract_first_link(data: &Value) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    if data.get("success").and_then(Value::as_bool) == Some(true) {
        if let Some(link) = data.get("downloadLink").and_then(non_empty) {
            return Some(link);
        }
    }
    if let Some(link) = data.get("link").and_then(non_empty) {
        return Some(link);
    }

    let first = data.get("files")?.as_array()?.first()?;
    ["direct_link", "download_link", "link", "dlink"]
        .iter()
        .find_map(|key| first.get(*key).and_then(non_empty))
}

/// 调用远程网关，返回 JSON 响应（错误响应同样返回，由调用方提取信息）
pub async fn fetch_remote(
    base: &str,
    mode: Mode,
    share_url: &str,
    pwd: &str,
    timeout: Duration,
) -> Result<Value> {
    let api_url = build_api_url(base, mode);
    let mut query = vec![("url", share_url)];
    if !pwd.is_empty() {
        query.push(("pwd", pwd));
    }

    let resp = reqwest::Client::builder()
        .timeout(timeout)
        .build()?
        .get(&api_url)
        .query(&query)
        .send()
        .await
        .with_context(|| format!("请求网关失败: {}", api_url))?;

    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .with_context(|| format!("网关返回的不是 JSON (status={})", status))?;

    if !status.is_success() {
        warn!(
            "⚠️ 网关返回 {}: {}",
            status,
            body.get("message").and_then(serde_json::Value::as_str).unwrap_or("")
        );
    }
    Ok(body)
}

/// 交互读取分享链接
pub fn read_share_url(input: impl BufRead) -> Result<String> {
    let line = input
        .lines()
        .next()
        .transpose()?
        .ok_or_else(|| anyhow!("未输入分享链接"))?;
    let url = line.trim();
    if url.is_empty() {
        return Err(anyhow!("未输入分享链接"));
    }
    Ok(url.to_string())
}
