use anyhow::{anyhow, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terabox_gateway::{
    cli::{self, Cli, Mode},
    config::Config,
    terabox::{format_file_info, ShareListing, TeraboxClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terabox_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse();

    let share_url = match args.share_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            eprintln!("🔸 TeraBox 分享链接解析");
            eprint!("📥 请输入分享链接: ");
            std::io::stderr().flush()?;
            cli::read_share_url(std::io::stdin().lock())?
        }
    };

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    // 结果输出到 stdout，日志在 stderr
    let body = match cli::resolve_base(args.base.as_deref(), &cli::api_url_candidates()) {
        Some(base) => {
            tracing::info!("⏳ 通过 {} 解析 ({:?}): {}", base, args.mode, share_url);
            let timeout = Duration::from_secs(config.terabox.http_timeout_secs);
            cli::fetch_remote(&base, args.mode, &share_url, &args.pwd, timeout).await?
        }
        None => {
            tracing::info!("⏳ 本地解析 ({:?}): {}", args.mode, share_url);
            let client = TeraboxClient::new(config.terabox)?;
            resolve_locally(&client, args.mode, &share_url, &args.pwd).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    match cli::extract_first_link(&body) {
        Some(link) => tracing::info!("✅ 下载链接: {}", link),
        None => tracing::warn!("⚠️ 未获取到下载链接，请稍后重试"),
    }

    Ok(())
}

async fn resolve_locally(
    client: &TeraboxClient,
    mode: Mode,
    share_url: &str,
    pwd: &str,
) -> Result<Value> {
    let files = match client.fetch_share_listing(share_url, pwd).await? {
        ShareListing::Files(files) => files,
        ShareListing::VerificationRequired { surl } => {
            return Err(anyhow!("该链接需要提取码或验证码 (surl={})", surl));
        }
    };

    if files.is_empty() {
        return Err(anyhow!("分享中没有文件"));
    }

    let files = match mode {
        Mode::Api2 => serde_json::to_value(client.resolve_direct_links(&files).await)?,
        Mode::Api => serde_json::to_value(files.iter().map(format_file_info).collect::<Vec<_>>())?,
    };
    Ok(json!({ "url": share_url, "files": files }))
}
