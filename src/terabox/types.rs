//! 数据类型

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 列表接口返回的单个文件记录
///
/// 上游字段类型并不稳定（数字 / 字符串 / null 混用），逐字段宽松地接收，
/// 类型不符的字段退回默认值，整条记录不会因此丢失。
#[derive(Debug, Clone, Default)]
pub struct RawFileRecord {
    pub server_filename: Option<String>,
    pub size: Value,
    pub isdir: bool,
    pub path: Option<String>,
    pub fs_id: Value,
    pub dlink: Option<String>,
    pub thumbs: Option<BTreeMap<String, Value>>,
}

impl<'de> Deserialize<'de> for RawFileRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// isdir 可能是 "1" / 1 / 1.0 / true / "0" / 0 / null
fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s.trim() == "1",
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

impl RawFileRecord {
    /// 从任意 JSON 值构造记录；非对象得到全默认记录
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self {
                size: Value::from(0),
                fs_id: Value::from(""),
                ..Self::default()
            };
        };

        let thumbs = match map.remove("thumbs") {
            Some(Value::Object(thumbs)) => Some(thumbs.into_iter().collect()),
            _ => None,
        };

        Self {
            server_filename: string_field(map.get("server_filename")),
            size: map.remove("size").unwrap_or_else(|| Value::from(0)),
            isdir: flag(map.get("isdir")),
            path: string_field(map.get("path")),
            fs_id: map.remove("fs_id").unwrap_or_else(|| Value::from("")),
            dlink: string_field(map.get("dlink")),
            thumbs,
        }
    }

    pub fn filename(&self) -> &str {
        self.server_filename.as_deref().unwrap_or("Unknown")
    }

    pub fn dlink(&self) -> &str {
        self.dlink.as_deref().unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }

    /// 非空的缩略图 (key, url)
    pub fn thumbnails(&self) -> impl Iterator<Item = (&str, &str)> {
        self.thumbs
            .iter()
            .flatten()
            .filter_map(|(key, url)| match url.as_str() {
                Some(u) if !u.is_empty() => Some((key.as_str(), u)),
                _ => None,
            })
    }

    pub fn thumbnail(&self, key: &str) -> Option<&str> {
        self.thumbs.as_ref()?.get(key)?.as_str()
    }
}

/// 分享列表获取结果
#[derive(Debug, Clone)]
pub enum ShareListing {
    Files(Vec<RawFileRecord>),
    /// 需要提取码或验证码（errno 400141），不算失败
    VerificationRequired { surl: String },
}

/// /api 输出的文件信息
#[derive(Debug, Clone, Serialize)]
pub struct FormattedFile {
    pub filename: String,
    pub size: String,
    pub size_bytes: Value,
    pub download_link: String,
    pub is_directory: bool,
    /// "宽x高" 或 "original" -> 缩略图地址
    pub thumbnails: BTreeMap<String, String>,
    pub path: String,
    pub fs_id: Value,
}

/// /api2 输出的文件信息（带直链）
#[derive(Debug, Clone, Serialize)]
pub struct DirectLinkFile {
    pub filename: String,
    pub size: String,
    pub size_bytes: Value,
    pub link: String,
    pub direct_link: Option<String>,
    pub thumbnail: String,
}
