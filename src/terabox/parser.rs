//! 分享页解析：令牌提取与 surl 提取

use super::error::ShareError;

const JS_TOKEN_START: &str = "fn%28%22";
const JS_TOKEN_END: &str = "%22%29";
const LOG_ID_START: &str = "dp-logid=";
const LOG_ID_END: &str = "&";

/// 分享页中抓取到的两个令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTokens {
    pub js_token: String,
    pub log_id: String,
}

/// 取 `start` 之后、下一个 `end` 之前的子串
pub fn find_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

/// 从分享页 HTML 中提取 jsToken 与 dp-logid
///
/// 任一缺失（或为空）都视为页面格式已变化。
pub fn extract_tokens(html: &str) -> Result<ShareTokens, ShareError> {
    let js_token = find_between(html, JS_TOKEN_START, JS_TOKEN_END).filter(|s| !s.is_empty());
    let log_id = find_between(html, LOG_ID_START, LOG_ID_END).filter(|s| !s.is_empty());

    match (js_token, log_id) {
        (Some(js_token), Some(log_id)) => Ok(ShareTokens {
            js_token: js_token.to_string(),
            log_id: log_id.to_string(),
        }),
        _ => Err(ShareError::MissingToken),
    }
}

/// 从（重定向后的）请求地址中提取 surl
///
/// 支持：
/// - https://www.terabox.app/sharing/link?surl=xxxx
/// - https://teraboxshare.com/s/1xxxx
pub fn extract_surl(resolved_url: &str) -> Result<String, ShareError> {
    let surl = if let Some(pos) = resolved_url.find("surl=") {
        let rest = &resolved_url[pos + "surl=".len()..];
        rest.split('&').next()
    } else if let Some(pos) = resolved_url.find("/s/") {
        let rest = &resolved_url[pos + "/s/".len()..];
        rest.split('?').next()
    } else {
        None
    };

    match surl {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(ShareError::InvalidUrlFormat),
    }
}
