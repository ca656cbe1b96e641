//! 测试用的上游 TeraBox 模拟服务

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use terabox_gateway::{
    config::{Config, TeraboxConfig},
    terabox::TeraboxClient,
    web, AppState,
};

pub const JS_TOKEN: &str = "A1B2C3D4E5";
pub const LOG_ID: &str = "778899";
pub const NDUS: &str = "SECRET";

pub struct MockUpstream {
    pub base: String,
    pub list_calls: AtomicUsize,
    pub dir_requests: Mutex<Vec<String>>,
    pub referers: Mutex<Vec<String>>,
    pub page_cookies: Mutex<Vec<String>>,
    pub list_cookies: Mutex<Vec<String>>,
}

impl MockUpstream {
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn share_url(&self, surl: &str) -> String {
        format!("{}/s/{}", self.base, surl)
    }

    /// 同一个分享页，但主机名换成 localhost（与列表接口主机不同）
    pub fn localhost_share_url(&self, surl: &str) -> String {
        self.share_url(surl).replacen("127.0.0.1", "localhost", 1)
    }

    pub fn config(&self) -> Config {
        let mut terabox = TeraboxConfig {
            list_url: format!("{}/share/list", self.base),
            http_timeout_secs: 5,
            direct_link_concurrency: 2,
            ..TeraboxConfig::default()
        };
        terabox.cookies.insert("ndus".to_string(), NDUS.to_string());
        Config {
            terabox,
            ..Config::default()
        }
    }

    pub fn client(&self) -> TeraboxClient {
        TeraboxClient::new(self.config().terabox).expect("client")
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("http://{}", addr))
}

/// 启动模拟上游
pub async fn spawn_upstream() -> Arc<MockUpstream> {
    let (listener, base) = bind().await;
    let upstream = Arc::new(MockUpstream {
        base,
        list_calls: AtomicUsize::new(0),
        dir_requests: Mutex::new(Vec::new()),
        referers: Mutex::new(Vec::new()),
        page_cookies: Mutex::new(Vec::new()),
        list_cookies: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/s/:surl", get(share_page))
        .route("/r/:surl", get(redirect_page))
        .route("/sharing/link", get(sharing_link_page))
        .route("/share/list", get(share_list))
        .route("/file/:name", get(dlink))
        .with_state(upstream.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("upstream server");
    });
    upstream
}

/// 启动网关，返回其基地址
pub async fn spawn_gateway(upstream: &MockUpstream) -> String {
    let state = Arc::new(AppState::new(upstream.config()).expect("state"));
    let (listener, base) = bind().await;
    let app = web::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("gateway server");
    });
    base
}

fn page_html() -> String {
    format!(
        r#"<html><head><script>var templateData = {{}}; window.jsToken = decodeURIComponent(`fn%28%22{}%22%29`);</script></head>
<body><img src="/log?dp-logid={}&type=pv"></body></html>"#,
        JS_TOKEN, LOG_ID
    )
}

fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn share_page(
    State(up): State<Arc<MockUpstream>>,
    Path(surl): Path<String>,
    headers: HeaderMap,
) -> Response {
    up.page_cookies.lock().unwrap().push(cookie_header(&headers));
    match surl.as_str() {
        "1notoken" => Html("<html><body>maintenance</body></html>".to_string()).into_response(),
        "1gone" => StatusCode::NOT_FOUND.into_response(),
        "1setcookie" => (
            [(header::SET_COOKIE, "session_hint=from_page; Path=/")],
            Html(page_html()),
        )
            .into_response(),
        _ => Html(page_html()).into_response(),
    }
}

async fn redirect_page(Path(surl): Path<String>) -> Redirect {
    Redirect::temporary(&format!("/sharing/link?surl={}", surl))
}

async fn sharing_link_page() -> Html<String> {
    Html(page_html())
}

fn file(base: &str, name: &str, size: serde_json::Value) -> serde_json::Value {
    json!({
        "server_filename": name,
        "size": size,
        "isdir": "0",
        "path": format!("/{}", name),
        "fs_id": 1000 + name.len(),
        "dlink": format!("{}/file/{}", base, name),
        "thumbs": {
            "url1": "https://thumb.example/t?size=c60_u60&quality=100",
            "url3": "https://thumb.example/t?size=200_u400c",
            "icon": ""
        }
    })
}

async fn share_list(
    State(up): State<Arc<MockUpstream>>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    up.list_calls.fetch_add(1, Ordering::SeqCst);
    up.list_cookies.lock().unwrap().push(cookie_header(&headers));
    if let Some(referer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) {
        up.referers.lock().unwrap().push(referer.to_string());
    }

    let param = |key: &str| q.get(key).map(String::as_str);
    if param("jsToken") != Some(JS_TOKEN) || param("dplogid") != Some(LOG_ID) {
        return Json(json!({"errno": -6, "errmsg": "bad token"})).into_response();
    }

    if let Some(dir) = param("dir") {
        up.dir_requests.lock().unwrap().push(dir.to_string());
        let params_ok = param("order") == Some("asc")
            && param("by") == Some("name")
            && param("desc").is_none()
            && param("root").is_none();
        if !params_ok {
            return Json(json!({"errno": 99, "errmsg": "bad dir params"})).into_response();
        }
    }

    let base = up.base.as_str();
    let body = match param("shorturl") {
        Some("1two") => json!({
            "errno": 0,
            "list": [file(base, "a.txt", json!(1024)), file(base, "missing", json!("1048576"))]
        }),
        Some("1setcookie") => json!({"errno": 0, "list": [file(base, "a.txt", json!(1024))]}),
        Some("1malformed") => json!({
            "errno": 0,
            "list": [
                file(base, "good.txt", json!(10)),
                {"server_filename": "numeric_dlink", "size": 20, "dlink": 123},
                {"server_filename": "arr_thumbs", "size": 30, "thumbs": []}
            ]
        }),
        Some("1verify") => json!({"errno": 400141, "errmsg": "need verify"}),
        Some("1empty") => json!({"errno": 0, "list": []}),
        Some("1nolist") => json!({"errno": 0}),
        Some("1expired") => json!({"errno": 2, "errmsg": "share expired"}),
        Some("1unavailable") => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Some("1dir" | "1dirnolist" | "1dirverify" | "1direrr") if param("dir").is_none() => json!({
            "errno": 0,
            "list": [
                {"server_filename": "Folder", "isdir": "1", "path": "/Folder", "size": 0, "fs_id": 1},
                file(base, "top.bin", json!(10))
            ]
        }),
        Some("1dir") => json!({
            "errno": 0,
            "list": [
                file(base, "c1.mp4", json!(1073741824u64)),
                file(base, "c2.mp4", json!(2048)),
                file(base, "c3.mp4", json!("oops"))
            ]
        }),
        Some("1dirnolist") => json!({"errno": 0}),
        Some("1dirverify") => json!({"errno": 400141, "errmsg": "need verify"}),
        Some("1direrr") => json!({"errno": 31066, "errmsg": "dir not found"}),
        _ => json!({"errno": 105, "errmsg": "share not found"}),
    };
    Json(body).into_response()
}

/// dlink：302 到 CDN；名为 missing 的文件不给 Location
async fn dlink(Path(name): Path<String>) -> Response {
    if name == "missing" {
        return StatusCode::OK.into_response();
    }
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("https://cdn.example/{}", name))],
    )
        .into_response()
}
