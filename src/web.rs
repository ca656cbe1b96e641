//! Web 服务器模块

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::terabox::{
    format_file_info, DirectLinkFile, FormattedFile, RawFileRecord, ShareError, ShareListing,
    TeraboxClient, ERRNO_VERIFICATION_REQUIRED,
};
use crate::AppState;

/// /v1/echo 回显的请求头
const ECHO_HEADERS: [&str; 5] = [
    "user-agent",
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip",
    "x-request-id",
];

/// /api、/api2 的查询参数，同名参数重复出现时取第一个
#[derive(Debug, Default)]
pub struct ShareQuery {
    pub url: Option<String>,
    pub pwd: Option<String>,
}

impl ShareQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut args = first_values(pairs);
        Self {
            url: args.remove("url"),
            pwd: args.remove("pwd"),
        }
    }
}

/// 查询参数按名称去重，保留第一次出现的值
fn first_values(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();
    for (key, value) in pairs {
        args.entry(key).or_insert(value);
    }
    args
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub status: &'static str,
    pub url: String,
    pub total_files: usize,
    pub files: Vec<T>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_password: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            url: None,
            error: None,
            errno: None,
            surl: None,
            requires_password: None,
            example: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// 网关错误，统一转换为 JSON 错误响应
#[derive(Debug)]
pub enum ApiError {
    /// 缺少 url 参数
    MissingUrl { endpoint: &'static str },
    /// 需要提取码 / 验证码
    VerificationRequired { url: String, surl: String },
    /// 上游请求或解析失败
    Share { url: String, source: ShareError },
    /// 列表为空
    NotFound { url: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl { .. } | ApiError::VerificationRequired { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Share { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    fn body(self) -> ErrorResponse {
        match self {
            ApiError::MissingUrl { endpoint } => ErrorResponse {
                example: Some(format!("{}?url=https://teraboxshare.com/s/...", endpoint)),
                ..ErrorResponse::new("Missing required parameter: url")
            },
            ApiError::VerificationRequired { url, surl } => ErrorResponse {
                url: Some(url),
                error: Some("Verification required".to_string()),
                errno: Some(ERRNO_VERIFICATION_REQUIRED),
                surl: Some(surl),
                requires_password: Some(true),
                ..ErrorResponse::new("This link requires password or captcha verification")
            },
            ApiError::Share { url, source } => ErrorResponse {
                url: Some(url),
                error: Some(source.to_string()),
                errno: Some(source.errno()),
                requires_password: Some(false),
                ..ErrorResponse::new(source.to_string())
            },
            ApiError::NotFound { url } => ErrorResponse {
                url: Some(url),
                ..ErrorResponse::new("No files found")
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Share { source, .. } => error!("❌ 解析失败: {}", source),
            ApiError::VerificationRequired { surl, .. } => warn!("🔒 需要验证: surl={}", surl),
            _ => {}
        }
        (status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 校验 url 参数，空字符串等同于缺失
pub fn require_url(query: &ShareQuery, endpoint: &'static str) -> ApiResult<String> {
    match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url.to_string()),
        _ => Err(ApiError::MissingUrl { endpoint }),
    }
}

/// /api 与 /api2 共用：获取文件列表，把验证 / 错误 / 空列表转换成 ApiError
async fn load_files(
    upstream: &TeraboxClient,
    url: &str,
    pwd: &str,
) -> ApiResult<Vec<RawFileRecord>> {
    let listing = upstream
        .fetch_share_listing(url, pwd)
        .await
        .map_err(|source| ApiError::Share {
            url: url.to_string(),
            source,
        })?;

    match listing {
        ShareListing::VerificationRequired { surl } => Err(ApiError::VerificationRequired {
            url: url.to_string(),
            surl,
        }),
        ShareListing::Files(files) if files.is_empty() => Err(ApiError::NotFound {
            url: url.to_string(),
        }),
        ShareListing::Files(files) => Ok(files),
    }
}

fn success<T>(url: String, files: Vec<T>) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        status: "success",
        url,
        total_files: files.len(),
        files,
        timestamp: now_iso(),
    })
}

/// 获取文件信息
pub async fn api_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<SuccessResponse<FormattedFile>>> {
    let query = ShareQuery::from_pairs(pairs);
    let url = require_url(&query, "/api")?;
    info!("📥 API 请求: {}", url);

    let upstream = state.upstream().await;
    let pwd = query.pwd.as_deref().unwrap_or("");
    let files = load_files(&upstream, &url, pwd).await?;

    let formatted: Vec<FormattedFile> = files.iter().map(format_file_info).collect();
    info!("✅ 返回 {} 个文件", formatted.len());
    Ok(success(url, formatted))
}

/// 获取文件信息并解析直链
pub async fn api2_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<SuccessResponse<DirectLinkFile>>> {
    let query = ShareQuery::from_pairs(pairs);
    let url = require_url(&query, "/api2")?;
    info!("📥 API2 请求: {}", url);

    let upstream = state.upstream().await;
    let files = load_files(&upstream, &url, "").await?;

    let resolved = upstream.resolve_direct_links(&files).await;
    Ok(success(url, resolved))
}

/// 服务信息
pub async fn index_handler() -> Json<Value> {
    Json(json!({
        "name": "TeraBox API",
        "version": crate::VERSION,
        "status": "operational",
        "endpoints": {
            "/": "API information",
            "/api": "Fetch file information from TeraBox link",
            "/api2": "Fetch files with direct download links",
            "/help": "Detailed usage instructions",
            "/health": "Health check",
        },
        "timestamp": now_iso(),
    }))
}

/// 健康检查端点
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: now_iso(),
    })
}

/// 使用说明
pub async fn help_handler() -> Json<Value> {
    Json(json!({
        "TeraBox API Documentation": {
            "version": crate::VERSION,
            "description": "Extract file information from TeraBox share links",
            "Endpoints": {
                "/api": {
                    "method": "GET",
                    "description": "Fetch file information",
                    "parameters": {
                        "url": "Required - TeraBox share link",
                        "pwd": "Optional - Password for protected links",
                    },
                    "example": "/api?url=https://teraboxshare.com/s/1ABC...",
                },
                "/api2": {
                    "method": "GET",
                    "description": "Fetch files with direct download links",
                    "parameters": {"url": "Required - TeraBox share link"},
                    "example": "/api2?url=https://teraboxshare.com/s/1ABC...",
                },
            },
            "Error Codes": {
                "0": "Success",
                "-1": "General error",
                "400141": "Verification required (password/captcha)",
            },
            "Response Format": {
                "success": {
                    "status": "success",
                    "url": "The requested URL",
                    "files": "Array of file objects",
                    "total_files": "Number of files",
                    "timestamp": "ISO timestamp",
                },
                "error": {
                    "status": "error",
                    "message": "Error description",
                    "errno": "Error code",
                },
            },
            "Notes": [
                "Cookies must be updated regularly (they expire)",
                "Links requiring passwords need pwd parameter",
                "Some links may require captcha verification",
            ],
        }
    }))
}

/// /v1 命名空间信息
pub async fn v1_index_handler() -> Json<Value> {
    Json(json!({
        "name": "TeraBox API",
        "namespace": "/v1",
        "version": "1.0",
        "status": "operational",
        "endpoints": {
            "/v1": "This metadata",
            "/v1/health": "Health check for v1",
            "/v1/echo": "Echo query parameters and selected headers",
        },
        "timestamp": now_iso(),
    }))
}

/// 回显查询参数与部分请求头，便于排查代理问题
pub async fn v1_echo_handler(
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Json<Value> {
    Json(json!({
        "args": first_values(pairs),
        "headers": echoed_headers(&headers),
        "timestamp": now_iso(),
    }))
}

fn echoed_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    ECHO_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            Some((canonical_header_name(name), value.to_string()))
        })
        .collect()
}

/// user-agent -> User-Agent, cf-connecting-ip -> Cf-Connecting-Ip
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// 创建 Web 路由
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/help", get(help_handler))
        .route("/api", get(api_handler))
        .route("/api2", get(api2_handler))
        .route("/v1", get(v1_index_handler))
        .route("/v1/", get(v1_index_handler))
        .route("/v1/health", get(health_handler))
        .route("/v1/echo", get(v1_echo_handler))
        .with_state(state)
}
