//! TeraBox 分享链接解析模块

pub mod client;
pub mod direct;
pub mod error;
pub mod format;
pub mod parser;
pub mod share;
pub mod types;

pub use client::TeraboxClient;
pub use error::ShareError;
pub use format::{format_file_info, format_size, thumbnail_label};
pub use parser::{extract_surl, extract_tokens, find_between, ShareTokens};
pub use types::{DirectLinkFile, FormattedFile, RawFileRecord, ShareListing};

/// 上游用于"需要提取码 / 验证码"的 errno
pub const ERRNO_VERIFICATION_REQUIRED: i64 = 400141;
