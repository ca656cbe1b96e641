//! 输出格式化：文件大小、缩略图尺寸、文件信息

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::types::{DirectLinkFile, FormattedFile, RawFileRecord};

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// 字节数转为可读字符串（1024 进制，两位小数），无法解析时返回 "Unknown"
pub fn format_size(size: &Value) -> String {
    let Some(bytes) = size_as_integer(size) else {
        debug!("⚠️ 无法解析文件大小: {}", size);
        return "Unknown".to_string();
    };

    let bytes = bytes as f64;
    let (value, unit) = if bytes >= GB {
        (bytes / GB, "GB")
    } else if bytes >= MB {
        (bytes / MB, "MB")
    } else if bytes >= KB {
        (bytes / KB, "KB")
    } else {
        (bytes, "bytes")
    };

    format!("{:.2} {}", value, unit)
}

fn size_as_integer(size: &Value) -> Option<i128> {
    match size {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i128)),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

/// 从缩略图地址的 size 参数推出 "宽x高"
///
/// size 形如 `c850_u580`，去掉所有 `c` 后按 `_u` 切分。
pub fn thumbnail_label(url: &str) -> String {
    let query = url
        .split_once('?')
        .map(|(_, q)| q.split('#').next().unwrap_or(""))
        .unwrap_or("");

    let size = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == "size" && !value.is_empty())
        .map(|(_, value)| value.replace('c', ""));

    if let Some(size) = size {
        let parts: Vec<&str> = size.split("_u").collect();
        if let [width, height] = parts.as_slice() {
            return format!("{}x{}", width, height);
        }
    }

    "original".to_string()
}

/// /api 的单个文件输出
pub fn format_file_info(record: &RawFileRecord) -> FormattedFile {
    let thumbnails: BTreeMap<String, String> = record
        .thumbnails()
        .map(|(_, url)| (thumbnail_label(url), url.to_string()))
        .collect();

    FormattedFile {
        filename: record.filename().to_string(),
        size: format_size(&record.size),
        size_bytes: record.size.clone(),
        download_link: record.dlink().to_string(),
        is_directory: record.isdir,
        thumbnails,
        path: record.path().to_string(),
        fs_id: record.fs_id.clone(),
    }
}

/// /api2 的单个文件输出，`direct_link` 由调用方解析后传入
pub fn direct_link_file(record: &RawFileRecord, direct_link: Option<String>) -> DirectLinkFile {
    DirectLinkFile {
        filename: record.filename().to_string(),
        size: format_size(&record.size),
        size_bytes: record.size.clone(),
        link: record.dlink().to_string(),
        direct_link,
        thumbnail: record.thumbnail("url3").unwrap_or("").to_string(),
    }
}
